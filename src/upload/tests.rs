use crate::upload::{UploadError, UploadValidator};

const PIXELS: &[u8] = b"\x89PNG...";

#[test]
fn test_accepts_allowed_extensions() {
    let validator = UploadValidator::new();
    for name in ["cat.png", "cat.jpg", "cat.JPEG", "cat.gif"] {
        assert!(validator.validate(name, PIXELS).is_ok(), "{} rejected", name);
    }
}

#[test]
fn test_rejects_other_extensions() {
    let validator = UploadValidator::new();
    let err = validator.validate("notes.txt", PIXELS).unwrap_err();
    assert_eq!(err, UploadError::DisallowedExtension("txt".to_string()));
    assert!(!validator.is_allowed("archive.tar.gz"));
    assert!(validator.is_allowed("photo.Png"));
}

#[test]
fn test_rejects_missing_name_and_extension() {
    let validator = UploadValidator::new();
    assert_eq!(validator.validate("", PIXELS).unwrap_err(), UploadError::MissingFile);
    assert_eq!(
        validator.validate("README", PIXELS).unwrap_err(),
        UploadError::NoExtension("README".to_string())
    );
}

#[test]
fn test_rejects_empty_body() {
    let validator = UploadValidator::new();
    let err = validator.validate("cat.png", b"").unwrap_err();
    assert_eq!(err, UploadError::EmptyUpload("cat.png".to_string()));
}

#[test]
fn test_hash_name_is_sha256_of_sanitized_name() {
    let validator = UploadValidator::new();
    let name = validator.validate("abc.png", PIXELS).unwrap();

    assert_eq!(
        name.hash,
        "abb1865ce4168d942bff8a9fe6fa5a74362ca931e4b17f4348111ccc6b1ce82b"
    );
    assert_eq!(name.extension, "png");
    assert_eq!(name.file_name(), format!("{}.png", name.hash));
    assert_eq!(name.compressed_file_name(8), format!("{}_compressed_8.png", name.hash));
}

#[test]
fn test_same_name_same_hash() {
    let validator = UploadValidator::new();
    let a = validator.validate("holiday photo.jpg", PIXELS).unwrap();
    let b = validator.validate("holiday  photo.jpg", PIXELS).unwrap();
    let c = validator.validate("other.jpg", PIXELS).unwrap();

    assert_eq!(a, b);
    assert_ne!(a.hash, c.hash);
}

#[test]
fn test_directories_keep_names_apart() {
    let validator = UploadValidator::new();
    let a = validator.validate("2020/IMG_0001.png", PIXELS).unwrap();
    let b = validator.validate("2021/IMG_0001.png", PIXELS).unwrap();
    let bare = validator.validate("IMG_0001.png", PIXELS).unwrap();

    assert_ne!(a.hash, b.hash);
    assert_ne!(a.hash, bare.hash);
}

#[test]
fn test_extension_is_lower_cased() {
    let validator = UploadValidator::new();
    let name = validator.validate("SHOUT.JPG", PIXELS).unwrap();
    assert_eq!(name.extension, "jpg");
    assert!(name.file_name().ends_with(".jpg"));
}

#[test]
fn test_sanitize_flattens_directories_and_spaces() {
    assert_eq!(UploadValidator::sanitize("a/b/my file.png").unwrap(), "a_b_my_file.png");
    assert_eq!(
        UploadValidator::sanitize("C:\\Users\\me\\pic.gif").unwrap(),
        "C_Users_me_pic.gif"
    );
    assert_eq!(UploadValidator::sanitize("./pic.png").unwrap(), "pic.png");
    assert_eq!(UploadValidator::sanitize("caf\u{e9}$.png").unwrap(), "caf.png");
}

#[test]
fn test_sanitize_neutralises_traversal_and_absolute() {
    assert_eq!(UploadValidator::sanitize("../etc/passwd.png").unwrap(), "etc_passwd.png");
    assert_eq!(UploadValidator::sanitize("/etc/passwd.png").unwrap(), "etc_passwd.png");
    assert_eq!(UploadValidator::sanitize("..\\..\\boot.ini").unwrap(), "boot.ini");
}

#[test]
fn test_sanitize_rejects_nothing_left() {
    assert!(UploadValidator::sanitize("$$$").is_err());
    assert!(UploadValidator::sanitize(".").is_err());
    assert!(UploadValidator::sanitize("../..").is_err());
}

#[test]
fn test_custom_extension_set() {
    let validator = UploadValidator::with_extensions([".BMP"]);
    assert!(validator.validate("scan.bmp", PIXELS).is_ok());
    assert!(validator.validate("scan.png", PIXELS).is_err());
}
