use std::fs;
use std::path::PathBuf;

use doxyedit::{
    properties, Alignment, Doxyfile, LineSeparator, ListMode, Location, Operator, Serializer,
};

fn fixture() -> String {
    let path = format!("{}/tests/fixtures/Doxyfile", env!("CARGO_MANIFEST_DIR"));
    fs::read_to_string(path).unwrap()
}

fn parse(text: &str) -> Doxyfile {
    Doxyfile::from_text(Location::File(PathBuf::from("/work/project/Doxyfile")), text)
}

fn reserialize(text: &str, serializer: Serializer) -> String {
    serializer.serialize(&parse(text))
}

#[test]
fn round_trip_is_byte_exact() {
    let text = fixture();
    let d = parse(&text);
    assert_eq!(d.line_separator(), LineSeparator::Lf);
    assert_eq!(Serializer::for_doxyfile(&d).serialize(&d), text);
    assert_eq!(d.to_text(), text);
}

#[test]
fn round_trip_with_crlf() {
    let text = fixture().replace('\n', "\r\n");
    let d = parse(&text);
    assert_eq!(d.line_separator(), LineSeparator::CrLf);
    assert_eq!(d.to_text(), text);
}

#[test]
fn round_trip_without_final_newline() {
    let text = "# head\nPROJECT_NAME = x\nINPUT = a \\\n  b";
    let d = parse(text);
    assert!(!d.final_newline());
    assert_eq!(d.to_text(), text);
}

#[test]
fn round_trip_of_odd_input() {
    for text in ["", "\n", "\n\n", "junk only", "=\n", "  A=1\n\tB +=\"x y\"  \n"] {
        let d = parse(text);
        assert_eq!(Serializer::for_doxyfile(&d).serialize(&d), text, "input {:?}", text);
    }
}

#[test]
fn line_separator_can_be_changed() {
    let text = fixture();
    let out = reserialize(&text, Serializer::new().separator(LineSeparator::CrLf));
    assert_eq!(out, text.replace('\n', "\r\n"));
}

#[test]
fn serializing_is_idempotent() {
    let text = fixture();
    let serializers = [
        Serializer::new().list_mode(ListMode::SingleLine),
        Serializer::new().list_mode(ListMode::Continued),
        Serializer::new().alignment(Alignment::Compact),
        Serializer::new()
            .alignment(Alignment::Compact)
            .list_mode(ListMode::Continued)
            .separator(LineSeparator::Cr),
    ];
    for serializer in &serializers {
        let once = reserialize(&text, *serializer);
        let twice = reserialize(&once, *serializer);
        assert_eq!(once, twice, "{:?}", serializer);
        // Nothing is lost on the way.
        let a = parse(&text);
        let b = parse(&once);
        for setting in a.settings() {
            let other = b.setting(setting.identifier()).unwrap();
            assert_eq!(setting.values(), other.values());
            assert_eq!(setting.operator(), other.operator());
        }
    }
}

#[test]
fn single_line_mode_joins_lists() {
    let out = reserialize(&fixture(), Serializer::new().list_mode(ListMode::SingleLine));
    assert!(out.contains("INPUT                  = src include \"docs/user guide\"\n"));
    assert!(out.contains("FILE_PATTERNS          = *.c *.h *.md\n"));
}

#[test]
fn continued_mode_splits_lists() {
    let out = reserialize(&fixture(), Serializer::new().list_mode(ListMode::Continued));
    assert!(out.contains(
        "FILE_PATTERNS          = *.c \\\n                         *.h \\\n                         *.md\n"
    ));
    assert!(out.contains("PROJECT_NAME           = \"Sample Project\"\n"));
}

#[test]
fn only_changed_settings_are_rewritten() {
    let text = fixture();
    let mut d = parse(&text);
    assert!(d.set_value("PROJECT_NUMBER", "2.0").unwrap());
    assert_eq!(d.to_text(), text.replace("= 1.2.3", "= 2.0"));
}

#[test]
fn changed_continued_setting_stays_continued() {
    let text = fixture();
    let mut d = parse(&text);
    d.set_values("INPUT", &["src", "lib"]).unwrap();
    let expected = text.replace(
        "INPUT                  = src \\\n                         include \\\n                         \"docs/user guide\"\n",
        "INPUT                  = src \\\n                         lib\n",
    );
    assert_eq!(d.to_text(), expected);
}

#[test]
fn trailing_backslash_does_not_continue_the_line() {
    let mut d = parse("STRIP_FROM_PATH = C:\\old\nINPUT = src\n");
    d.set_values("STRIP_FROM_PATH", &["C:\\work\\"]).unwrap();
    let text = d.to_text();
    assert_eq!(text, "STRIP_FROM_PATH        = \"C:\\work\\\"\nINPUT = src\n");

    let again = parse(&text);
    assert_eq!(again.setting("STRIP_FROM_PATH").unwrap().values(), vec!["C:\\work\\"]);
    assert_eq!(again.setting("INPUT").unwrap().value(), "src");
    assert_eq!(again.to_text(), text);

    let continued = Serializer::new().list_mode(ListMode::Continued);
    d.set_values("STRIP_FROM_PATH", &["C:\\a\\", "D:\\b\\"]).unwrap();
    let text = continued.serialize(&d);
    let again = parse(&text);
    assert_eq!(again.setting("STRIP_FROM_PATH").unwrap().values(), vec!["C:\\a\\", "D:\\b\\"]);
    assert_eq!(again.setting("INPUT").unwrap().values(), vec!["src"]);
    assert_eq!(continued.serialize(&again), text);

    let err = d.set_values("STRIP_FROM_PATH", &["C:\\my dir\\", "D:\\"]).unwrap_err();
    assert_eq!(err.kind, doxyedit::ErrorKind::Value);
}

#[test]
fn added_settings_go_at_the_end() {
    let mut d = parse("PROJECT_NAME = x\n");
    d.add_setting("GENERATE_XML", "YES");
    d.append(doxyedit::Setting::new("INPUT", "more").with_operator(Operator::Append));
    let out = Serializer::new().alignment(Alignment::Compact).serialize(&d);
    assert_eq!(out, "PROJECT_NAME = x\nGENERATE_XML = YES\nINPUT += more\n");
}

#[test]
fn settings_are_found_and_split() {
    let d = parse(&fixture());
    let input = d.setting("INPUT").unwrap();
    assert!(input.continued());
    assert_eq!(input.values(), vec!["src", "include", "docs/user guide"]);
    assert_eq!(d.setting("PROJECT_NAME").unwrap().values(), vec!["Sample Project"]);
    assert!(!d.setting("PROJECT_BRIEF").unwrap().has_value());
    assert_eq!(d.setting("EXCLUDE_PATTERNS").unwrap().operator(), Operator::Append);
    assert_eq!(d.setting("STRIP_FROM_PATH").unwrap().value(), "C:\\work\\project");
    assert_eq!(
        d.setting("ALIASES").unwrap().values(),
        vec!["license=\\par License:\\n", "todo2=\\todo"]
    );
}

#[test]
fn groups_follow_metadata() {
    let d = parse(&fixture());
    let names: Vec<_> = d.groups().iter().map(|g| g.name()).collect();
    assert_eq!(names, vec!["Project", "Input", "LaTeX", properties::OTHERS]);
    assert_eq!(
        d.group(properties::OTHERS).unwrap().identifiers(),
        &["MY_CUSTOM_TAG".to_string()]
    );
    assert!(d.group("Input").unwrap().contains("EXCLUDE_PATTERNS"));
}

#[test]
fn load_save_and_change_detection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Doxyfile");
    fs::write(&path, fixture()).unwrap();

    let mut d = Doxyfile::from_file(&path).unwrap();
    assert!(!d.changed_on_disk());
    d.set_value("RECURSIVE", "NO").unwrap();
    d.save(&Serializer::for_doxyfile(&d)).unwrap();
    assert!(!d.changed_on_disk());

    let again = Doxyfile::from_file(&path).unwrap();
    assert_eq!(again.setting("RECURSIVE").unwrap().value(), "NO");
    assert_eq!(again, d);

    fs::remove_file(&path).unwrap();
    assert!(d.changed_on_disk());
    assert!(d.load().is_err());
}
