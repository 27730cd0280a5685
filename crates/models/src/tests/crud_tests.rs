use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, QueryFilter};
use uuid::Uuid;

use super::test_db;
use crate::{account, account_transaction, ai_conversation, ai_message, document, super_contribution, trust_income};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[tokio::test]
async fn test_account_and_transactions() -> Result<()> {
    let Some(db) = test_db().await else { return Ok(()) };
    let user = Uuid::new_v4();

    let acc = account::create(&db, user, account::NewAccount {
        name: "Everyday".into(),
        account_type: "transaction".into(),
        institution: "Westpac".into(),
        account_number: Some("032-000 123456".into()),
        currency: None,
        opening_balance: Some(dec!(100.00)),
    }).await?;
    assert_eq!(acc.currency, "AUD");
    assert_eq!(acc.kind(), Some(account::AccountType::Transaction));

    let txn = account_transaction::create(&db, user, account_transaction::NewTransaction {
        account_id: acc.id,
        txn_date: d(2024, 8, 1),
        description: "Coles".into(),
        amount: dec!(-42.50),
        category: Some("Groceries".into()),
        external_id: None,
    }, account_transaction::TransactionSource::Manual).await?;
    assert_eq!(txn.category.as_deref(), Some("groceries"));

    let found = account_transaction::Entity::find()
        .filter(account_transaction::Column::AccountId.eq(acc.id))
        .all(&db)
        .await?;
    assert_eq!(found.len(), 1);

    // 删除账户级联删除流水
    acc.delete(&db).await?;
    let left = account_transaction::Entity::find_by_id(txn.id).one(&db).await?;
    assert!(left.is_none());
    Ok(())
}

#[tokio::test]
async fn test_trust_income_fy_is_derived() -> Result<()> {
    let Some(db) = test_db().await else { return Ok(()) };
    let user = Uuid::new_v4();
    let row = trust_income::create(&db, user, trust_income::NewTrustIncome {
        financial_year: None,
        source: "CBA shares".into(),
        income_type: "dividend".into(),
        amount: dec!(700),
        franking_credits: dec!(300),
        received_date: d(2025, 3, 15),
        notes: Some("  ".into()),
    }).await?;
    assert_eq!(row.financial_year, 2025);
    assert_eq!(row.notes, None);

    let wrong_year = trust_income::create(&db, user, trust_income::NewTrustIncome {
        financial_year: Some(2024),
        source: "Term deposit".into(),
        income_type: "interest".into(),
        amount: dec!(50),
        franking_credits: dec!(0),
        received_date: d(2025, 3, 15),
        notes: None,
    }).await;
    assert!(wrong_year.is_err());
    Ok(())
}

#[tokio::test]
async fn test_super_document_and_chat_rows() -> Result<()> {
    let Some(db) = test_db().await else { return Ok(()) };
    let user = Uuid::new_v4();

    let c = super_contribution::create(&db, user, super_contribution::NewContribution {
        member_name: "Alex".into(),
        fund_name: "AustralianSuper".into(),
        contribution_type: "concessional".into(),
        amount: dec!(2500),
        contribution_date: d(2024, 6, 30),
    }).await?;
    assert_eq!(c.financial_year, 2024);

    let doc = document::create(&db, user, document::NewDocument {
        title: "Tax return".into(),
        file_name: "../../etc/return.pdf".into(),
        mime_type: "application/pdf".into(),
        size_bytes: 10,
        storage_key: format!("{user}/x.pdf"),
        tags: vec!["Tax".into()],
        ..Default::default()
    }).await?;
    assert_eq!(doc.file_name, "return.pdf");
    assert_eq!(doc.tag_list(), vec!["tax"]);

    let conv = ai_conversation::create(&db, user, None).await?;
    assert_eq!(conv.title, ai_conversation::DEFAULT_TITLE);
    ai_message::append(&db, conv.id, ai_message::MessageRole::User, "hello").await?;
    let msgs = conv.find_related(ai_message::Entity).all(&db).await?;
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].role, "user");
    Ok(())
}
