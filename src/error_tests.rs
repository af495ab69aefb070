use super::*;
use crate::persona::validate;

#[test]
fn http_status_mapping() {
    let v: AppError = validate(&serde_json::json!({})).unwrap_err().into();
    assert_eq!(v.http_status(), 422);
    assert_eq!(AppError::storage("storage_error", "down").http_status(), 500);
    assert_eq!(AppError::internal("internal_panic", "internal server error").http_status(), 500);
}

#[test]
fn validation_keeps_violations() {
    let err = validate(&serde_json::json!({"name": "Bob", "age": 200, "height": 1.8})).unwrap_err();
    match AppError::from(err) {
        AppError::Validation { code, violations, message } => {
            assert_eq!(code, "validation_error");
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].field, "age");
            assert!(message.contains("age"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn storage_messages_carry_cause() {
    let cause = StorageError::Read {
        location: "bucket/personas.csv".into(),
        source: object_store::Error::Generic { store: "test", source: "access denied".into() },
    };
    let save = AppError::save_failed(&cause);
    assert!(save.message().starts_with("error saving to object store: "));
    assert!(save.message().contains("access denied"));
    let read = AppError::read_failed(&cause);
    assert!(read.message().starts_with("error reading from object store: "));
    assert_eq!(read.to_string(), format!("storage_error: {}", read.message()));
}

#[test]
fn into_response_uses_mapped_status() {
    let resp = AppError::storage("storage_error", "down").into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let resp = AppError::from(validate(&serde_json::json!([])).unwrap_err()).into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn internal_renders_code_and_detail() {
    let err = AppError::internal("internal_panic", "internal server error");
    assert_eq!(err.code_str(), "internal_panic");
    assert_eq!(err.to_string(), "internal_panic: internal server error");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
