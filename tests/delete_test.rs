mod common;

use anyhow::Result;
use common::{listing_lines, test_service, SampleReceipts};
use receipts::domain::{Category, PaymentMethod, Store};

#[tokio::test]
async fn test_delete_unknown_id_changes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleReceipts::record(&service).await?;
    let before = listing_lines(&service).await?;

    let deleted = service.delete_receipt(404).await?;
    assert!(!deleted);
    assert_eq!(listing_lines(&service).await?, before);

    Ok(())
}

#[tokio::test]
async fn test_delete_on_empty_database() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(!service.delete_receipt(1).await?);
    assert_eq!(service.count_receipts().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_only_that_receipt() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ids = SampleReceipts::record(&service).await?;

    assert!(service.delete_receipt(ids[1]).await?);

    let remaining: Vec<_> = service
        .list_receipts()
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, vec![ids[0], ids[2]]);

    // A second delete of the same id finds nothing
    assert!(!service.delete_receipt(ids[1]).await?);

    Ok(())
}

#[tokio::test]
async fn test_delete_keeps_orphaned_reference_rows() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ids = SampleReceipts::record(&service).await?;

    // Receipt 2 is the only one using "Shell", "Fuel" and "Debit Card"
    service.delete_receipt(ids[1]).await?;

    assert_eq!(service.count_references::<Store>().await?, 2);
    assert_eq!(service.count_references::<Category>().await?, 2);
    assert_eq!(service.count_references::<PaymentMethod>().await?, 3);

    Ok(())
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ids = SampleReceipts::record(&service).await?;

    service.delete_receipt(ids[2]).await?;
    let next = service
        .record_receipt("Shell", "Fuel", "Cash", 100, common::parse_date("2024-02-01"))
        .await?;
    assert_eq!(next, 4);

    Ok(())
}
