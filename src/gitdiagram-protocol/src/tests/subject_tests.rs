use crate::subject::{Subject, SubjectParseError};

#[test]
fn test_subject_is_lowercased() {
    let subject = Subject::new("Alice", "Repo1").unwrap();
    assert_eq!(subject.owner(), "alice");
    assert_eq!(subject.repository(), "repo1");
    assert_eq!(subject, Subject::new("alice", "REPO1").unwrap());
}

#[test]
fn test_subject_display() {
    let subject = Subject::new("fastapi", "fastapi").unwrap();
    assert_eq!(subject.to_string(), "fastapi/fastapi");
}

#[test]
fn test_subject_parse_plain() {
    let subject: Subject = "Pallets/Flask".parse().unwrap();
    assert_eq!(subject.owner(), "pallets");
    assert_eq!(subject.repository(), "flask");
}

#[test]
fn test_subject_parse_github_url() {
    let subject: Subject = "https://github.com/tom-draper/api-analytics.git"
        .parse()
        .unwrap();
    assert_eq!(subject.to_string(), "tom-draper/api-analytics");

    let subject: Subject = "github.com/streamlit/streamlit/".parse().unwrap();
    assert_eq!(subject.to_string(), "streamlit/streamlit");
}

#[test]
fn test_subject_parse_rejects_bad_input() {
    assert!(matches!(
        "just-a-name".parse::<Subject>(),
        Err(SubjectParseError::InvalidFormat(_))
    ));
    assert!(matches!(
        "a/b/c".parse::<Subject>(),
        Err(SubjectParseError::InvalidFormat(_))
    ));
    assert_eq!(
        "/repo".parse::<Subject>(),
        Err(SubjectParseError::EmptyOwner)
    );
    assert_eq!(
        Subject::new("owner", "  "),
        Err(SubjectParseError::EmptyRepository)
    );
    assert!(matches!(
        Subject::new("own er", "repo"),
        Err(SubjectParseError::InvalidCharacter { character: ' ', .. })
    ));
}

#[test]
fn test_subject_serde_roundtrip_shape() {
    let subject = Subject::new("alice", "repo1").unwrap();
    let json = serde_json::to_value(&subject).unwrap();
    assert_eq!(json["owner"], "alice");
    assert_eq!(json["repository"], "repo1");
}
