use keymint_license::{DeviceInfo, FingerprintProvider, HostFingerprint, StaticFingerprint};

// ── Host ─────────────────────────────────────────────────────────

#[test]
fn device_info_describes_host() {
    let info = DeviceInfo::collect();
    assert_eq!(info.os_name, std::env::consts::OS);
    assert_eq!(info.arch, std::env::consts::ARCH);
    assert!(!info.hostname.is_empty());
    assert!(!info.os_version.is_empty());
}

#[test]
fn device_info_json_fields() {
    let value = serde_json::to_value(DeviceInfo::collect()).unwrap();
    for field in ["os_name", "os_version", "hostname", "arch"] {
        assert!(value.get(field).is_some(), "missing {field}");
    }
}

#[test]
fn host_fingerprint_repeats_on_same_machine() {
    let first = HostFingerprint::generate();
    assert_eq!(first.id().len(), 22);
    assert_eq!(first, HostFingerprint::generate());
    assert_eq!(first.current_fingerprint(), first.id());
}

// ── Providers ────────────────────────────────────────────────────

#[test]
fn static_fingerprint_is_not_normalized() {
    let provider = StaticFingerprint::new("  Mixed Case  ");
    assert_eq!(provider.current_fingerprint(), "  Mixed Case  ");
}

#[test]
fn closures_are_providers() {
    let provider = || "from-closure".to_string();
    assert_eq!(provider.current_fingerprint(), "from-closure");
}

#[test]
fn providers_work_as_trait_objects() {
    let providers: Vec<Box<dyn FingerprintProvider>> = vec![
        Box::new(StaticFingerprint::new("a")),
        Box::new(|| "b".to_string()),
    ];
    let ids: Vec<String> = providers.iter().map(|p| p.current_fingerprint()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}
