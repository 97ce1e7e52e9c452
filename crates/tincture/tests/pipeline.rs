//! End-to-end tests: parse, transform and print through the public API.

use proptest::prelude::*;
use tincture::{
    CssModuleReference, CssModulesConfig, ErrorKind, ParseErrorKind, ParseOptions, PrintOptions,
    StyleSheet, TransformOptions,
};

fn transform_with(source: &str, query: &str) -> String {
    let mut sheet = tincture::parse(source, ParseOptions::default()).expect("source should parse");
    let targets = tincture::targets_from_query(query).expect("query should resolve");
    tincture::transform(&mut sheet, &TransformOptions::new().targets(targets))
        .expect("transform should succeed");
    tincture::print(&sheet, &PrintOptions::default())
        .expect("print should succeed")
        .code
}

fn minify(sheet: &StyleSheet) -> String {
    tincture::print(sheet, &PrintOptions::new().minify(true))
        .expect("print should succeed")
        .code
}

#[test]
fn test_lch_fallback_comes_first() {
    let out = transform_with(".a { color: lch(50% 40 30) }", "safari 4");
    let fallback = out.find("color: #").expect("a hex fallback");
    let original = out.find("color: lch(").expect("the original declaration");
    assert!(fallback < original, "{out}");

    // Targets that understand lch() are left alone.
    let out = transform_with(".a { color: lch(50% 40 30) }", "safari 16");
    assert_eq!(out.matches("color:").count(), 1);
}

#[test]
fn test_nesting_flattened_for_old_targets() {
    insta::assert_snapshot!(transform_with(".foo { & h1 { color: red } }", "chrome 100"), @r"
    .foo h1 {
      color: red;
    }
    ");
}

#[test]
fn test_composes_from_another_file() {
    let options = ParseOptions::new()
        .filename("baz.css")
        .css_modules(CssModulesConfig::new().pattern("[name]_[local]"));
    let mut sheet = tincture::parse(
        ".baz { composes: bar from \"./bar.css\"; color: red }",
        options,
    )
    .unwrap();
    tincture::transform(&mut sheet, &TransformOptions::default()).unwrap();

    let result = tincture::print(&sheet, &PrintOptions::default()).unwrap();
    let exports = result.exports.unwrap();
    assert_eq!(exports["baz"].name, "baz_baz");
    assert_eq!(
        exports["baz"].composes,
        [CssModuleReference::Dependency {
            name: "bar".to_string(),
            specifier: "./bar.css".to_string(),
        }]
    );
    assert_eq!(result.code, ".baz_baz {\n  color: red;\n}\n");
}

#[test]
fn test_missing_value_is_a_parse_error() {
    let source = ".foo{color:}";
    let err = tincture::parse(source, ParseOptions::new().filename("foo.css")).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::Parse(ParseErrorKind::MissingValue {
            property: "color".to_string()
        })
    );

    let rendered = String::from_utf8(strip_ansi_escapes::strip(err.render(source))).unwrap();
    assert!(
        rendered.contains("ParseError: missing value for property `color`"),
        "{rendered}"
    );
    assert!(rendered.contains("foo.css"), "{rendered}");
}

#[test]
fn test_unused_symbols_and_dependencies() {
    let source = r#"
        @import "reset.css";
        .used { background: url(bg.png) }
        .unused { color: red }
        @keyframes gone { from { opacity: 0 } }
    "#;
    let mut sheet = tincture::parse(source, ParseOptions::default()).unwrap();
    let options = TransformOptions::new()
        .unused_symbols(["unused", "gone"])
        .analyze_dependencies(true);
    tincture::transform(&mut sheet, &options).unwrap();

    let result = tincture::print(&sheet, &PrintOptions::default()).unwrap();
    assert!(!result.code.contains("unused"));
    assert!(!result.code.contains("gone"));
    let urls: Vec<&str> = result.dependencies.iter().map(|dep| dep.url()).collect();
    assert_eq!(urls, ["reset.css", "bg.png"]);
}

#[test]
fn test_pseudo_class_replacement() {
    let sheet = tincture::parse(".btn:hover { color: red }", ParseOptions::default()).unwrap();
    let result =
        tincture::print(&sheet, &PrintOptions::new().minify(true).pseudo_class("hover", "is-hover"))
            .unwrap();
    assert_eq!(result.code, ".btn.is-hover{color:red}");
}

#[test]
fn test_print_result_serializes() {
    let sheet = tincture::parse(".a { color: red }", ParseOptions::default()).unwrap();
    let result = tincture::print(&sheet, &PrintOptions::new().minify(true)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["code"], ".a{color:red}");
    assert!(json["map"].is_null());
}

fn stylesheet() -> impl Strategy<Value = String> {
    let property = prop::sample::select(vec!["color", "margin", "display", "opacity", "--x"]);
    let value = prop::sample::select(vec!["red", "0", "1px 2px", "none", "#abcdef", "var(--y)"]);
    let declaration = (property, value).prop_map(|(p, v)| format!("{p}: {v}"));
    let rule = (
        "[a-z]{1,6}",
        prop::collection::vec(declaration, 1..4),
        any::<bool>(),
    )
        .prop_map(|(class, declarations, nested)| {
            let body = declarations.join("; ");
            if nested {
                format!(".{class} {{ {body}; &:hover {{ {body} }} }}")
            } else {
                format!(".{class} {{ {body} }}")
            }
        });
    prop::collection::vec(rule, 0..5).prop_map(|rules| rules.join("\n"))
}

#[test]
fn test_unicode_range_round_trips() {
    let source = "@font-face { unicode-range: U+0025-00FF, u+4??; } .a { unicode-range: U+26 }";
    let sheet = tincture::parse(source, ParseOptions::default()).unwrap();
    let pretty = tincture::print(&sheet, &PrintOptions::default()).unwrap().code;
    assert!(pretty.contains("unicode-range: U+0025-00FF, u+4??;"), "{pretty}");
    assert!(pretty.contains("unicode-range: U+26;"), "{pretty}");
    let minified = minify(&sheet);
    assert_eq!(
        minified,
        "@font-face{unicode-range:U+0025-00FF,u+4??}.a{unicode-range:U+26}"
    );
    let reparsed = tincture::parse(&minified, ParseOptions::default()).unwrap();
    assert_eq!(minify(&reparsed), minified);
}

#[test]
fn test_rules_with_newer_selectors_are_not_merged() {
    for selector in [".b:has(.c)", ".b:focus-visible", "::selection", "[a=b i]"] {
        let source = format!(".a {{ color: red }} {selector} {{ color: red }}");
        let sheet = tincture::parse(&source, ParseOptions::default()).unwrap();
        let out = minify(&sheet);
        assert_eq!(out.matches("color:red").count(), 2, "{out}");
    }
    let sheet = tincture::parse(".a { color: red } .b:hover { color: red }", ParseOptions::default()).unwrap();
    assert_eq!(minify(&sheet), ".a,.b:hover{color:red}");
}

#[test]
fn test_minify_shortens_declarations() {
    for (source, expected) in [
        (".a { margin: 0 0 0 0 }", ".a{margin:0}"),
        (
            ".a { margin-top: 1px; margin-right: 1px; margin-bottom: 1px; margin-left: 1px }",
            ".a{margin:1px}",
        ),
        (".a { color: red; color: blue }", ".a{color:blue}"),
        (".a { color: red } .a { color: blue }", ".a{color:blue}"),
        (
            ".a { position: -webkit-sticky; position: sticky }",
            ".a{position:-webkit-sticky;position:sticky}",
        ),
    ] {
        let sheet = tincture::parse(source, ParseOptions::default()).unwrap();
        assert_eq!(minify(&sheet), expected, "{source}");
    }

    // Pretty output keeps declarations as written.
    let sheet = tincture::parse(".a { color: red; color: blue }", ParseOptions::default()).unwrap();
    let pretty = tincture::print(&sheet, &PrintOptions::default()).unwrap().code;
    assert_eq!(pretty, ".a {\n  color: red;\n  color: blue;\n}\n");
}

#[test]
fn test_custom_media() {
    let source = "@custom-media --narrow (max-width: 30em); @media (--narrow) { .a { color: red } }";
    let mut sheet = tincture::parse(source, ParseOptions::new().custom_media(true)).unwrap();
    tincture::transform(&mut sheet, &TransformOptions::default()).unwrap();
    assert_eq!(minify(&sheet), "@media (max-width:30em){.a{color:red}}");

    // Without the option the rule is kept as an unknown at-rule.
    let mut sheet = tincture::parse(source, ParseOptions::default()).unwrap();
    tincture::transform(&mut sheet, &TransformOptions::default()).unwrap();
    assert!(minify(&sheet).starts_with("@custom-media"));
}

#[test]
fn test_misspelled_important() {
    let err = tincture::parse("b{c:d!importnt}", ParseOptions::default()).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::Parse(ParseErrorKind::UnexpectedToken("!".to_string()))
    );
}

proptest! {
    #[test]
    fn minified_output_is_stable(source in stylesheet()) {
        let sheet = tincture::parse(&source, ParseOptions::default()).unwrap();
        let once = minify(&sheet);
        let reparsed = tincture::parse(&once, ParseOptions::default()).unwrap();
        prop_assert_eq!(minify(&reparsed), once);
    }

    #[test]
    fn local_names_are_deterministic(name in "[a-z][a-z0-9_-]{0,10}", file in "[a-z]{1,8}") {
        let filename = format!("/src/{file}.css");
        let first = tincture::css_modules::generate_local_name(&filename, &name, "[hash]_[local]").unwrap();
        let second = tincture::css_modules::generate_local_name(&filename, &name, "[hash]_[local]").unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.ends_with(&name));
    }
}
