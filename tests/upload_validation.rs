use photostudio_api::upload::{
    MAX_FILE_BYTES, UploadCandidate, UploadIssue, expected_mime_for_extension,
    storage_file_name, validate,
};

fn candidate(file_name: &str, content_type: &str, size: u64) -> UploadCandidate {
    UploadCandidate {
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        size,
    }
}

#[test]
fn valid_files_pass_with_no_issues() {
    for (name, mime) in [
        ("portrait.jpg", "image/jpeg"),
        ("cutout.png", "image/png"),
        ("banner.webp", "image/webp"),
    ] {
        assert!(
            validate(&candidate(name, mime, 1024)).is_empty(),
            "{name} should be accepted"
        );
    }
}

#[test]
fn files_at_the_size_limit_pass_and_over_it_fail() {
    assert!(validate(&candidate("big.jpg", "image/jpeg", MAX_FILE_BYTES)).is_empty());

    let issues = validate(&candidate("huge.jpg", "image/jpeg", MAX_FILE_BYTES + 1));
    assert!(issues.iter().any(|i| matches!(i, UploadIssue::TooLarge { .. })));
}

#[test]
fn unsupported_mime_types_are_rejected() {
    for mime in ["image/gif", "application/pdf", "text/plain"] {
        let issues = validate(&candidate("photo.jpg", mime, 1024));
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, UploadIssue::UnsupportedType(_))),
            "{mime} should be rejected"
        );
    }
}

#[test]
fn extension_mime_mismatch_is_flagged() {
    // Declared jpeg but the extension says png: the file is blocked.
    let issues = validate(&candidate("photo.png", "image/jpeg", 1024));
    assert!(issues.iter().any(|i| matches!(
        i,
        UploadIssue::TypeMismatch { declared, extension }
            if declared == "image/jpeg" && extension == "png"
    )));

    // A matching pair produces no mismatch.
    let issues = validate(&candidate("photo.png", "image/png", 1024));
    assert!(
        !issues
            .iter()
            .any(|i| matches!(i, UploadIssue::TypeMismatch { .. }))
    );
}

#[test]
fn jpg_and_jpeg_extensions_both_mean_jpeg() {
    assert_eq!(expected_mime_for_extension("jpg"), Some("image/jpeg"));
    assert_eq!(expected_mime_for_extension("JPEG"), Some("image/jpeg"));
    assert_eq!(expected_mime_for_extension("png"), Some("image/png"));
    assert_eq!(expected_mime_for_extension("webp"), Some("image/webp"));
    assert_eq!(expected_mime_for_extension("gif"), None);
}

#[test]
fn suspicious_file_names_are_rejected() {
    for name in [
        "../../../etc/passwd.jpg",
        "uploads/nested.jpg",
        "back\\slash.jpg",
        ".hidden.jpg",
        "shell.php.jpg",
        "",
    ] {
        let issues = validate(&candidate(name, "image/jpeg", 1024));
        assert!(
            issues
                .iter()
                .any(|i| matches!(i, UploadIssue::InvalidFileName(_))),
            "{name:?} should be rejected"
        );
    }
}

#[test]
fn an_invalid_file_accumulates_every_applicable_issue() {
    let issues = validate(&candidate("../evil.gif", "application/pdf", MAX_FILE_BYTES * 2));
    assert!(issues.len() >= 3, "expected type, size and name issues: {issues:?}");
}

#[test]
fn storage_names_hide_the_original_and_keep_the_extension() {
    let name = storage_file_name("My Vacation Photo.JPG");
    assert!(name.ends_with(".jpg"));
    assert!(!name.to_lowercase().contains("vacation"));

    // Two files with the same original name must not collide.
    let other = storage_file_name("My Vacation Photo.JPG");
    assert_ne!(name, other);
}

#[test]
fn storage_names_fall_back_when_there_is_no_extension() {
    let name = storage_file_name("raw-scan");
    assert!(name.ends_with(".bin"));
}
