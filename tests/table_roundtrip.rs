//! Table ↔ library round trips, including the file-level helpers.

use std::fs;

use kipart::adapters::adapter_for;
use kipart::symbol::arrange::build_part;
use kipart::symbol::error::SymbolError;
use kipart::symbol::options::LayoutOptions;
use kipart::symbol::part::{Library, RawPart};
use kipart::symbol::pin::{PinStyle, PinType, Side};
use kipart::symbol::reader::parse_library;
use kipart::symbol::writer::{write_library, WriteMode};
use kipart::table::{read_table, read_table_file, save_table, write_table};

const INPUT: &str = "\
LM358,
ref:,U
fp:,Package_SO:SOIC-8
desc:,Dual operational amplifier
keywords:,dual opamp
pin,name,type,side,unit,style,hidden
1,OUTA,output,right,A,,
2,-INA,input,left,A,inverted,
3,+INA,input,left,A,,
4,V-,power_in,bottom,PWR,,
5,+INB,input,left,B,,
6,-INB,input,left,B,inverted,
7,OUTB,output,right,B,,
8,V+,power_in,top,PWR,,

74HC74
Pin,Name,Type,Side,Style
1,~{CLR},in,L,
2,D,in,L,
3,CLK,in,L,clk
4,~{PRE},in,L,
5,Q,out,R,
6,~{Q},out,R,
7,GND,pwr,B,
14,VCC,pwr,T,
";

fn build_all(parts: &[RawPart], opts: &LayoutOptions) -> Library {
    let mut lib = Library::new();
    for raw in parts {
        let (part, diagnostics) = build_part(raw, opts).unwrap();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        lib.insert(part);
    }
    lib
}

fn options() -> LayoutOptions {
    LayoutOptions {
        alt_delimiter: Some('/'),
        ..LayoutOptions::default()
    }
}

#[test]
fn input_is_understood() {
    let opts = options();
    let read = read_table(INPUT).unwrap();
    assert!(read.rejected.is_empty());
    let lib = build_all(&read.parts, &opts);

    let lm358 = lib.get("LM358").unwrap();
    assert_eq!(lm358.footprint, "Package_SO:SOIC-8");
    assert_eq!(lm358.description, "Dual operational amplifier");
    let ids: Vec<&str> = lm358.units.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["A", "B", "PWR"]);

    let ff = lib.get("74HC74").unwrap();
    let clk = ff.pins().find(|p| p.number == "3").unwrap();
    assert_eq!(clk.style, PinStyle::Clock);
    assert_eq!(clk.side, Side::Left);
    let vcc = ff.pins().find(|p| p.number == "14").unwrap();
    assert_eq!(vcc.pin_type, PinType::PowerIn);
    assert_eq!(vcc.side, Side::Top);
}

#[test]
fn table_round_trip() {
    let opts = options();
    let lib = build_all(&read_table(INPUT).unwrap().parts, &opts);

    let text = write_table(&lib, opts.alt_delimiter).unwrap();
    let again = build_all(&read_table(&text).unwrap().parts, &opts);
    assert_eq!(again, lib);
}

#[test]
fn library_to_table_matches_source_table() {
    let opts = options();
    let lib = build_all(&read_table(INPUT).unwrap().parts, &opts);
    let expected = write_table(&lib, opts.alt_delimiter).unwrap();

    let symbols = write_library(&lib, WriteMode::Overwrite, &opts).unwrap().text;
    let parsed = parse_library(&symbols).unwrap();
    assert_eq!(write_table(&parsed, opts.alt_delimiter).unwrap(), expected);
}

#[test]
fn files_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("parts.csv");
    let opts = options();
    let lib = build_all(&read_table(INPUT).unwrap().parts, &opts);

    save_table(&csv_path, &lib, opts.alt_delimiter, false).unwrap();
    assert!(matches!(
        save_table(&csv_path, &lib, opts.alt_delimiter, false),
        Err(SymbolError::OutputExists { .. })
    ));
    save_table(&csv_path, &lib, opts.alt_delimiter, true).unwrap();

    let read = read_table_file(&csv_path).unwrap();
    assert_eq!(build_all(&read.parts, &opts), lib);
}

#[test]
fn windows_1252_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    fs::write(&path, b"R\xd6HRE\npin,name\n1,A\xb5\n").unwrap();

    let read = read_table_file(&path).unwrap();
    assert_eq!(read.parts[0].name, "R\u{d6}HRE");
    assert_eq!(read.parts[0].pins[0].name, "A\u{b5}");
}

#[test]
fn generic_adapter_reads_the_same_table() {
    let source = adapter_for("generic").unwrap();
    let parts = source.read(INPUT, "parts.csv").unwrap();
    assert_eq!(parts, read_table(INPUT).unwrap().parts);
}
