use docstore_path::{Path, PathError};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn path_construction_matrix() {
    let cases: Vec<(Path, &str)> = vec![
        (Path::new(["a.b", "c"]), "a.b.c"),
        (Path::new(vec![Path::from("a"), Path::from(0usize)]), "a.0"),
        (Path::new(Vec::<Path>::new()), ""),
        (Path::new([Some("x"), None, Some("y.z")]), "x.y.z"),
        (Path::from(vec!["p.q".to_string(), String::new()]), "p.q"),
    ];
    for (path, joined) in cases {
        assert_eq!(path.joined(), joined);
    }
}

#[test]
fn path_lookup_matrix() {
    let doc = json!({
        "site": {"title": "Home", "pages": [{"slug": "a"}, {"slug": "b"}]},
        "flag": false,
        "nothing": null
    });

    let hits = [
        ("site.title", json!("Home")),
        ("site.pages.1.slug", json!("b")),
        ("site.title.0", json!("H")),
        ("flag", json!(false)),
        ("nothing", json!(null)),
    ];
    for (path, expected) in hits {
        assert_eq!(
            Path::parse(path).lookup(&doc).map(|v| v.into_owned()),
            Some(expected),
            "lookup of {path}"
        );
    }

    let misses = ["site.missing", "site.pages.2", "site.pages.x", "flag.x", "nothing.x"];
    for path in misses {
        assert!(Path::parse(path).lookup(&doc).is_none(), "lookup of {path}");
    }
}

#[test]
fn path_relationships() {
    let deep = Path::parse("a.b.c");
    let mid = Path::parse("a.b");
    assert!(deep.is_sub_path_of(&mid));
    assert!(!mid.is_sub_path_of(&deep));
    assert_eq!(deep.parent(), mid);
    assert_eq!(mid.concat(deep.slice(2..)), deep);
}

#[test]
fn path_pointer_errors() {
    assert_eq!(Path::from_json_pointer("nope"), Err(PathError::PointerInvalid));
}

proptest! {
    #[test]
    fn pointer_roundtrip_preserves_keys(keys in prop::collection::vec("[a-z~/.]{1,6}", 0..6)) {
        let path = Path::from_steps(keys.clone());
        let back = Path::from_json_pointer(&path.to_json_pointer()).unwrap();
        prop_assert_eq!(back.as_slice(), &keys[..]);
    }

    #[test]
    fn parsed_paths_have_no_empty_steps(s in "[a-z.]{0,16}") {
        let path = Path::parse(&s);
        prop_assert!(path.iter().all(|step| !step.is_empty()));
        prop_assert_eq!(Path::parse(&path.joined()), path);
    }
}
