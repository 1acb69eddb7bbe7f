//! Formatting of a report model into display strings.

use crate::document::rules::{format_currency, format_date, format_tax_id};
use crate::models::config::ReportConfig;
use crate::models::document::IssuerInfo;
use crate::models::report::{RenderedIssuer, RenderedItem, RenderedReport, ReportModel};

/// Turns a [`ReportModel`] into a [`RenderedReport`].
///
/// This is the only place amounts are rounded; the model keeps them exact.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    config: ReportConfig,
}

impl ReportFormatter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, report: &ReportModel) -> RenderedReport {
        RenderedReport {
            issuer: self.issuer(report.issuer()),
            period: report
                .period()
                .map(|period| period.to_string())
                .unwrap_or_else(|| self.config.unknown_period.clone()),
            items: report
                .items()
                .iter()
                .map(|item| RenderedItem {
                    description: item.description.clone(),
                    amount: self.amount(item.amount),
                    date: item
                        .emission_date
                        .map(|date| format_date(date, &self.config.date_format))
                        .unwrap_or_else(|| self.config.not_available.clone()),
                })
                .collect(),
            total: self.amount(report.total()),
        }
    }

    fn amount(&self, amount: rust_decimal::Decimal) -> String {
        format_currency(
            amount,
            &self.config.currency_symbol,
            self.config.decimal_places,
        )
    }

    fn issuer(&self, issuer: Option<&IssuerInfo>) -> RenderedIssuer {
        match issuer {
            Some(issuer) => RenderedIssuer {
                tax_id: format_tax_id(&issuer.tax_id),
                legal_name: issuer.legal_name.clone(),
                trade_name: issuer.trade_name.clone(),
                address: issuer.address.format(),
            },
            None => {
                let marker = &self.config.not_available;
                RenderedIssuer {
                    tax_id: marker.clone(),
                    legal_name: marker.clone(),
                    trade_name: marker.clone(),
                    address: marker.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{IssuerAddress, LineItem};
    use crate::models::report::ReferencePeriod;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn item(description: &str, amount: &str, date: Option<NaiveDate>) -> LineItem {
        LineItem {
            description: description.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            emission_date: date,
        }
    }

    fn issuer() -> IssuerInfo {
        IssuerInfo {
            tax_id: "11222333000181".to_string(),
            legal_name: "Comercio de Pecas Ltda".to_string(),
            trade_name: "Pecas Express".to_string(),
            address: IssuerAddress {
                street: "Rua das Flores".to_string(),
                number: "123".to_string(),
                neighborhood: "Centro".to_string(),
                municipality: "Curitiba".to_string(),
                state: "PR".to_string(),
            },
        }
    }

    #[test]
    fn test_render_full_report() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10);
        let report = ReportModel::new(
            Some(issuer()),
            date.map(ReferencePeriod::from_date),
            vec![
                item("Widget", "100.00", date),
                item("Gadget", "50", None),
            ],
        )
        .unwrap();

        let rendered = ReportFormatter::default().render(&report);

        assert_eq!(
            rendered,
            RenderedReport {
                issuer: RenderedIssuer {
                    tax_id: "11.222.333/0001-81".to_string(),
                    legal_name: "Comercio de Pecas Ltda".to_string(),
                    trade_name: "Pecas Express".to_string(),
                    address: "Rua das Flores, 123, Centro, Curitiba - PR".to_string(),
                },
                period: "03/2024".to_string(),
                items: vec![
                    RenderedItem {
                        description: "Widget".to_string(),
                        amount: "R$ 100.00".to_string(),
                        date: "10/03/2024".to_string(),
                    },
                    RenderedItem {
                        description: "Gadget".to_string(),
                        amount: "R$ 50.00".to_string(),
                        date: "N/D".to_string(),
                    },
                ],
                total: "R$ 150.00".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_issuer_and_period_use_markers() {
        let report = ReportModel::new(None, None, Vec::new()).unwrap();
        let rendered = ReportFormatter::default().render(&report);

        assert_eq!(rendered.issuer.tax_id, "N/D");
        assert_eq!(rendered.issuer.legal_name, "N/D");
        assert_eq!(rendered.issuer.trade_name, "N/D");
        assert_eq!(rendered.issuer.address, "N/D");
        assert_eq!(rendered.period, "unknown");
        assert!(rendered.items.is_empty());
        assert_eq!(rendered.total, "R$ 0.00");
    }

    #[test]
    fn test_total_rounds_half_up_once() {
        let report = ReportModel::new(
            None,
            None,
            vec![item("A", "10.00", None), item("B", "5.005", None)],
        )
        .unwrap();
        let rendered = ReportFormatter::default().render(&report);

        assert_eq!(rendered.items[1].amount, "R$ 5.01");
        assert_eq!(rendered.total, "R$ 15.01");
    }

    #[test]
    fn test_custom_presentation() {
        let config = ReportConfig {
            currency_symbol: "BRL".to_string(),
            decimal_places: 3,
            date_format: "%Y-%m-%d".to_string(),
            not_available: "-".to_string(),
            unknown_period: "?".to_string(),
        };
        let date = NaiveDate::from_ymd_opt(2023, 12, 31);
        let report = ReportModel::new(None, None, vec![item("A", "1.2345", date)]).unwrap();

        let rendered = ReportFormatter::new(config).render(&report);

        assert_eq!(rendered.items[0].amount, "BRL 1.235");
        assert_eq!(rendered.items[0].date, "2023-12-31");
        assert_eq!(rendered.issuer.address, "-");
        assert_eq!(rendered.period, "?");
    }
}
