use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// OAuth token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One organisation the user granted access to (`GET /connections`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XeroTenant {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_type: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
}

impl XeroTenant {
    pub fn display_name(&self) -> &str {
        self.tenant_name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or(&self.tenant_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountsEnvelope {
    #[serde(rename = "Accounts", default)]
    pub accounts: Vec<XeroBankAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XeroBankAccount {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "BankAccountNumber", default)]
    pub bank_account_number: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BankTransactionsEnvelope {
    #[serde(rename = "BankTransactions", default)]
    pub bank_transactions: Vec<XeroBankTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XeroContact {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XeroBankTransaction {
    #[serde(rename = "BankTransactionID")]
    pub bank_transaction_id: String,
    /// `RECEIVE`, `SPEND`, `RECEIVE-OVERPAYMENT`, `SPEND-PREPAYMENT`, ...
    #[serde(rename = "Type")]
    pub kind: String,
    /// Xero's `/Date(1585785600000+0000)/` form.
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    /// ISO form, preferred when present.
    #[serde(rename = "DateString", default)]
    pub date_string: Option<String>,
    #[serde(rename = "Total")]
    pub total: Decimal,
    #[serde(rename = "Reference", default)]
    pub reference: Option<String>,
    #[serde(rename = "Contact", default)]
    pub contact: Option<XeroContact>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl XeroBankTransaction {
    /// Money in is positive, money out negative.
    pub fn signed_amount(&self) -> Option<Decimal> {
        let kind = self.kind.to_ascii_uppercase();
        let total = self.total.abs().round_dp(2);
        if kind.starts_with("RECEIVE") {
            Some(total)
        } else if kind.starts_with("SPEND") {
            Some(-total)
        } else {
            None
        }
    }

    pub fn txn_date(&self) -> Option<NaiveDate> {
        if let Some(s) = self.date_string.as_deref() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                return Some(dt.date());
            }
            if let Ok(d) = NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d") {
                return Some(d);
            }
        }
        self.date.as_deref().and_then(parse_msjson_date)
    }

    pub fn description(&self) -> String {
        let contact = self.contact.as_ref().and_then(|c| c.name.as_deref()).map(str::trim).filter(|s| !s.is_empty());
        let reference = self.reference.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (contact, reference) {
            (Some(c), Some(r)) => format!("{c} - {r}"),
            (Some(c), None) => c.to_string(),
            (None, Some(r)) => r.to_string(),
            (None, None) => format!("Xero {}", self.kind.to_ascii_lowercase()),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status.as_deref().map(|s| s.eq_ignore_ascii_case("DELETED")).unwrap_or(false)
    }
}

/// Parse `/Date(1585785600000+0000)/` into a date.
pub fn parse_msjson_date(s: &str) -> Option<NaiveDate> {
    let inner = s.trim().strip_prefix("/Date(")?.strip_suffix(")/")?;
    let end = inner.find(&['+', '-'][..]).filter(|&i| i > 0).unwrap_or(inner.len());
    let millis: i64 = inner[..end].parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn txn(kind: &str, total: Decimal) -> XeroBankTransaction {
        XeroBankTransaction {
            bank_transaction_id: "bt-1".into(),
            kind: kind.into(),
            date: Some("/Date(1585785600000+0000)/".into()),
            date_string: None,
            total,
            reference: None,
            contact: Some(XeroContact { name: Some("Origin Energy".into()) }),
            status: Some("AUTHORISED".into()),
        }
    }

    #[test]
    fn receive_is_positive_spend_negative() {
        assert_eq!(txn("RECEIVE", dec!(10)).signed_amount(), Some(dec!(10)));
        assert_eq!(txn("RECEIVE-OVERPAYMENT", dec!(5)).signed_amount(), Some(dec!(5)));
        assert_eq!(txn("SPEND", dec!(12.345)).signed_amount(), Some(dec!(-12.34)));
        assert_eq!(txn("SPEND-PREPAYMENT", dec!(1)).signed_amount(), Some(dec!(-1)));
        assert_eq!(txn("TRANSFER", dec!(1)).signed_amount(), None);
    }

    #[test]
    fn dates_from_both_forms() {
        assert_eq!(txn("SPEND", dec!(1)).txn_date(), NaiveDate::from_ymd_opt(2020, 4, 2));
        let mut t = txn("SPEND", dec!(1));
        t.date_string = Some("2024-07-15T00:00:00".into());
        assert_eq!(t.txn_date(), NaiveDate::from_ymd_opt(2024, 7, 15));
        assert_eq!(parse_msjson_date("garbage"), None);
        assert_eq!(parse_msjson_date("/Date(0)/"), NaiveDate::from_ymd_opt(1970, 1, 1));
    }

    #[test]
    fn decodes_accounts_payload() {
        let json = r#"{"Accounts":[{"AccountID":"a-1","Name":"Business Everyday","BankAccountNumber":"062000 12345678","Type":"BANK","Status":"ACTIVE"}]}"#;
        let env: AccountsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.accounts.len(), 1);
        assert_eq!(env.accounts[0].bank_account_number.as_deref(), Some("062000 12345678"));
    }

    #[test]
    fn decodes_numeric_total_and_description() {
        let json = r#"{"BankTransactions":[{"BankTransactionID":"b1","Type":"SPEND","Total":42.5,"Reference":"INV-9","Contact":{"Name":"Telstra"}}]}"#;
        let env: BankTransactionsEnvelope = serde_json::from_str(json).unwrap();
        let t = &env.bank_transactions[0];
        assert_eq!(t.signed_amount(), Some(dec!(-42.5)));
        assert_eq!(t.description(), "Telstra - INV-9");
    }
}
