use std::process::Command;

#[test]
fn missing_filter_prints_usage_and_fails() {
    let out = Command::new(env!("CARGO_BIN_EXE_netmon")).output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"));
    assert_eq!(stderr.matches("error").count(), 1);
}
