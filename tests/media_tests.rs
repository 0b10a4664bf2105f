use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use campaign_service::models::media::{MediaKind, MediaLimits, MediaPayload};

/// Test: Raw bytes become a base64 payload with the kind inferred from the extension
#[test]
fn test_payload_from_bytes() -> Result<()> {
    let payload = MediaPayload::from_bytes("holiday.jpg", b"fake image bytes", &limits())?;

    assert_eq!(payload.kind, MediaKind::Image);
    assert_eq!(payload.filename, "holiday.jpg");
    assert_eq!(STANDARD.decode(&payload.data)?, b"fake image bytes");

    Ok(())
}

/// Test: Video extensions map to the video kind
#[test]
fn test_video_kind_inference() {
    assert_eq!(MediaKind::from_filename("clip.mp4"), Some(MediaKind::Video));
    assert_eq!(MediaKind::from_filename("clip.WEBM"), Some(MediaKind::Video));
    assert_eq!(MediaKind::from_filename("pic.PNG"), Some(MediaKind::Image));
    assert_eq!(MediaKind::from_filename("notes.txt"), None);
    assert_eq!(MediaKind::from_filename("noextension"), None);
}

/// Test: Unsupported file types are rejected
#[test]
fn test_unsupported_extension_is_rejected() {
    let result = MediaPayload::from_bytes("document.pdf", b"%PDF", &limits());

    let error = result.expect_err("pdf is not a supported media type");
    assert!(error.to_string().contains("Unsupported media type"));
}

/// Test: Per-kind size caps are enforced
#[test]
fn test_size_limits_are_enforced() {
    let tight = MediaLimits {
        max_image_bytes: 4,
        max_video_bytes: 1024,
    };

    let too_large = MediaPayload::from_bytes("big.png", b"12345", &tight);
    assert!(too_large.expect_err("over the image cap").to_string().contains("too large"));

    let video_ok = MediaPayload::from_bytes("small.mp4", b"12345", &tight);
    assert!(video_ok.is_ok(), "video cap is larger and should pass");
}

/// Test: A data-URL prefix is stripped from base64 input
#[test]
fn test_data_url_prefix_is_stripped() -> Result<()> {
    let encoded = STANDARD.encode(b"fake image bytes");
    let data_url = format!("data:image/png;base64,{encoded}");

    let payload = MediaPayload::from_base64("pic.png", &data_url, &limits())?;
    assert_eq!(payload.data, encoded);

    let bare = MediaPayload::from_base64("pic.png", &encoded, &limits())?;
    assert_eq!(bare.data, encoded);

    Ok(())
}

/// Test: Invalid base64 input is rejected
#[test]
fn test_invalid_base64_is_rejected() {
    let result = MediaPayload::from_base64("pic.png", "not-base64!!!", &limits());

    let error = result.expect_err("invalid base64 must fail");
    assert!(error.to_string().contains("not valid base64"));
}

fn limits() -> MediaLimits {
    MediaLimits {
        max_image_bytes: 10 * 1024 * 1024,
        max_video_bytes: 50 * 1024 * 1024,
    }
}
