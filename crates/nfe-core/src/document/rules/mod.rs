//! Field rules for NF-e documents: amounts, timestamps and tax ids.

pub mod amounts;
pub mod dates;
pub mod patterns;
pub mod tax_id;

pub use amounts::{format_currency, parse_amount, round_currency};
pub use dates::{format_date, parse_emission_date, parse_emission_timestamp};
pub use tax_id::{format_tax_id, validate_cnpj, validate_cpf, validate_tax_id};
