//! Common regex patterns for NF-e field validation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Decimal amounts as written by NF-e (dot separator, no grouping,
    // at most 13 integer and 10 fraction digits)
    pub static ref AMOUNT: Regex = Regex::new(
        r"^-?\d{1,13}(?:\.\d{1,10})?$"
    ).unwrap();

    // UTC offset suffix of a timestamp
    pub static ref UTC_OFFSET: Regex = Regex::new(
        r"^[+-]\d{2}:\d{2}$"
    ).unwrap();

    // Separators used when tax ids are printed (12.345.678/0001-95)
    pub static ref TAX_ID_SEPARATORS: Regex = Regex::new(
        r"[.\-/\s]"
    ).unwrap();
}
