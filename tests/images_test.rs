mod common;

use anyhow::Result;
use common::{parse_date, test_service};
use receipts::application::{AppError, ImageOutcome};
use receipts::domain::{Category, PaymentMethod, Store};

/// A few bytes that look like the start of a JPEG, plus a NUL and high bytes
const IMAGE_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x7F, 0x80];

#[tokio::test]
async fn test_image_round_trip() -> Result<()> {
    let (service, temp) = test_service().await?;

    let source = temp.path().join("receipt.jpg");
    std::fs::write(&source, IMAGE_BYTES)?;

    let id = service
        .record_receipt_with_image(
            "Target",
            "Household",
            "Credit Card",
            2599,
            parse_date("2024-03-10"),
            &source,
        )
        .await?;

    let receipt = service.get_receipt(id).await?;
    assert!(receipt.has_image());
    assert_eq!(receipt.image_size, IMAGE_BYTES.len() as i64);

    let destination = temp.path().join("out.jpg");
    let outcome = service.retrieve_image(id, &destination).await?;
    assert_eq!(
        outcome,
        ImageOutcome::Written {
            path: destination.clone(),
            bytes: IMAGE_BYTES.len(),
        }
    );
    assert_eq!(std::fs::read(&destination)?, IMAGE_BYTES);

    Ok(())
}

#[tokio::test]
async fn test_retrieve_overwrites_existing_file() -> Result<()> {
    let (service, temp) = test_service().await?;

    let source = temp.path().join("receipt.png");
    std::fs::write(&source, b"new image")?;
    let id = service
        .record_receipt_with_image("Target", "Household", "Cash", 100, parse_date("2024-03-10"), &source)
        .await?;

    let destination = temp.path().join("existing.png");
    std::fs::write(&destination, b"a much longer file that should be replaced")?;

    service.retrieve_image(id, &destination).await?;
    assert_eq!(std::fs::read(&destination)?, b"new image");

    Ok(())
}

#[tokio::test]
async fn test_receipt_without_image_writes_nothing() -> Result<()> {
    let (service, temp) = test_service().await?;

    let id = service
        .record_receipt("Shell", "Fuel", "Debit Card", 5500, parse_date("2024-01-07"))
        .await?;

    let destination = temp.path().join("none.jpg");
    let outcome = service.retrieve_image(id, &destination).await?;
    assert_eq!(outcome, ImageOutcome::Missing);
    assert!(!destination.exists());

    Ok(())
}

#[tokio::test]
async fn test_unknown_receipt_writes_nothing() -> Result<()> {
    let (service, temp) = test_service().await?;

    let destination = temp.path().join("ghost.jpg");
    let outcome = service.retrieve_image(42, &destination).await?;
    assert_eq!(outcome, ImageOutcome::Missing);
    assert!(!destination.exists());

    Ok(())
}

#[tokio::test]
async fn test_empty_image_file_counts_as_no_image() -> Result<()> {
    let (service, temp) = test_service().await?;

    let source = temp.path().join("empty.jpg");
    std::fs::write(&source, b"")?;
    let id = service
        .record_receipt_with_image("Target", "Household", "Cash", 100, parse_date("2024-03-10"), &source)
        .await?;

    let destination = temp.path().join("out.jpg");
    assert_eq!(service.retrieve_image(id, &destination).await?, ImageOutcome::Missing);
    assert!(!destination.exists());

    Ok(())
}

#[tokio::test]
async fn test_unreadable_image_leaves_database_untouched() -> Result<()> {
    let (service, temp) = test_service().await?;

    let missing = temp.path().join("does-not-exist.jpg");
    let result = service
        .record_receipt_with_image(
            "New Store",
            "New Category",
            "New Method",
            100,
            parse_date("2024-03-10"),
            &missing,
        )
        .await;

    match result {
        Err(AppError::ImageRead { path, source }) => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected ImageRead error, got {:?}", other),
    }

    assert_eq!(service.count_receipts().await?, 0);
    assert_eq!(service.count_references::<Store>().await?, 0);
    assert_eq!(service.count_references::<Category>().await?, 0);
    assert_eq!(service.count_references::<PaymentMethod>().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_unwritable_destination_is_an_error() -> Result<()> {
    let (service, temp) = test_service().await?;

    let source = temp.path().join("receipt.jpg");
    std::fs::write(&source, IMAGE_BYTES)?;
    let id = service
        .record_receipt_with_image("Target", "Household", "Cash", 100, parse_date("2024-03-10"), &source)
        .await?;

    let destination = temp.path().join("no-such-dir").join("out.jpg");
    let result = service.retrieve_image(id, &destination).await;
    assert!(matches!(result, Err(AppError::ImageWrite { .. })));

    Ok(())
}
