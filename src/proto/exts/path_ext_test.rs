use crate::proto::gnmi::Path;
use crate::proto::gnmi::PathElem;
use crate::PathError;

#[test]
fn test_parse_plain_and_keyed_elements() {
    let path = Path::parse("/interfaces/interface[name=eth0]/state/enabled").unwrap();

    assert_eq!(path.elem.len(), 4);
    assert_eq!(path.elem[0], PathElem::new("interfaces"));
    assert_eq!(path.elem[1], PathElem::new("interface").with_key("name", "eth0"));
    assert_eq!(path.elem[3].name, "enabled");
}

#[test]
fn test_parse_root_forms() {
    assert!(Path::parse("").unwrap().is_root());
    assert!(Path::parse("/").unwrap().is_root());
    assert_eq!(Path::default().to_string(), "/");
}

#[test]
fn test_parse_key_value_containing_slash() {
    let path = Path::parse("/interfaces/interface[name=Ethernet1/1]/config").unwrap();

    assert_eq!(path.elem.len(), 3);
    assert_eq!(path.elem[1].key.get("name").map(String::as_str), Some("Ethernet1/1"));
}

#[test]
fn test_parse_multiple_keys_and_escapes() {
    let path = Path::parse(r"/a/b[x=1][y=a\]b]").unwrap();

    let b = &path.elem[1];
    assert_eq!(b.key.get("x").map(String::as_str), Some("1"));
    assert_eq!(b.key.get("y").map(String::as_str), Some("a]b"));
}

#[test]
fn test_display_round_trips_through_parse() {
    let text = r"/network-instances/network-instance[name=default]/protocols/protocol[identifier=BGP][name=a\]b]/config";
    let path = Path::parse(text).unwrap();

    assert_eq!(Path::parse(&path.to_string()).unwrap(), path);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        Path::parse("/a/b[name=eth0"),
        Err(PathError::UnterminatedKey { .. })
    ));
    assert!(matches!(
        Path::parse("/a/b[name]"),
        Err(PathError::MalformedKey { .. })
    ));
    assert!(matches!(
        Path::parse("/a/[name=x]"),
        Err(PathError::EmptyName { .. })
    ));
    assert!(matches!(
        Path::parse("/a/b[x=1]c"),
        Err(PathError::MalformedKey { .. })
    ));
}

#[test]
fn test_has_prefix_compares_keys() {
    let path = Path::parse("/interfaces/interface[name=eth0]/state/mtu").unwrap();

    assert!(path.has_prefix(&Path::parse("/interfaces/interface[name=eth0]").unwrap()));
    assert!(!path.has_prefix(&Path::parse("/interfaces/interface[name=eth1]").unwrap()));
    assert!(!path.has_prefix(&Path::parse("/interfaces/interface").unwrap()));
    assert!(path.has_prefix(&Path::default()));
}

#[test]
fn test_matches_supports_wildcards() {
    let path = Path::parse("/interfaces/interface[name=eth0]/state/mtu").unwrap();

    assert!(path.matches(&Path::parse("/interfaces/interface").unwrap()));
    assert!(path.matches(&Path::parse("/interfaces/interface[name=*]/state").unwrap()));
    assert!(path.matches(&Path::parse("/*/interface[name=eth0]").unwrap()));
    assert!(!path.matches(&Path::parse("/interfaces/interface[name=eth1]").unwrap()));
    assert!(!path.matches(&Path::parse("/interfaces/interface[name=eth0]/config").unwrap()));
}

#[test]
fn test_join_keeps_origin_and_target() {
    let mut prefix = Path::parse("/interfaces").unwrap();
    prefix.origin = "openconfig".into();
    prefix.target = "dut".into();

    let joined = prefix.join(&Path::parse("/interface[name=eth0]").unwrap());
    assert_eq!(joined.to_string(), "/interfaces/interface[name=eth0]");
    assert_eq!(joined.origin, "openconfig");
    assert_eq!(joined.target, "dut");
}
