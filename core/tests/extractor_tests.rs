use std::io::Cursor;

use sheet_audit::extractor::{load_cell_grid, load_drawing_texts, load_workbook_model};
use sheet_audit::{CellScalar, ContainerError, ContainerLimits, OpcContainer};

mod common;
use common::WorkbookBuilder;

fn open(bytes: Vec<u8>) -> OpcContainer {
    OpcContainer::open_from_reader(Cursor::new(bytes)).expect("open package")
}

#[test]
fn workbook_model_lists_sheets_in_declared_order() {
    let bytes = WorkbookBuilder::new()
        .sheet("表紙")
        .sheet("テスト項目")
        .sheet("付録")
        .build();
    let mut container = open(bytes);
    let model = load_workbook_model(&mut container).expect("model");
    assert_eq!(model.sheet_names, ["表紙", "テスト項目", "付録"]);
    assert_eq!(model.sheet_position("テスト項目"), Some(2));
    assert_eq!(model.sheet_position("nope"), None);
}

#[test]
fn missing_shared_strings_part_yields_empty_table() {
    let bytes = WorkbookBuilder::new().sheet("表紙").build();
    let mut container = open(bytes);
    let model = load_workbook_model(&mut container).expect("model");
    assert!(model.shared.is_empty());
}

#[test]
fn shared_string_cells_resolve_through_the_table() {
    let bytes = WorkbookBuilder::new()
        .shared_strings(&["確認", "済"])
        .sheet("表紙")
        .shared("A1", "0")
        .shared("A2", "1")
        .build();
    let mut container = open(bytes);
    let model = load_workbook_model(&mut container).expect("model");
    let grid = load_cell_grid(&mut container, &model.sheet_names[0], 1, &model.shared)
        .expect("grid");
    assert_eq!(grid.get_a1("A1"), Some(&CellScalar::Text("確認".into())));
    assert_eq!(grid.get_a1("A2"), Some(&CellScalar::Text("済".into())));
}

#[test]
fn bad_shared_string_references_become_absent_cells() {
    let bytes = WorkbookBuilder::new()
        .shared_strings(&["only"])
        .sheet("S")
        .shared("A1", "7")
        .shared("A2", "abc")
        .shared("A3", "0")
        .build();
    let mut container = open(bytes);
    let model = load_workbook_model(&mut container).expect("model");
    let grid = load_cell_grid(&mut container, "S", 1, &model.shared).expect("grid");
    assert_eq!(grid.get_a1("A1"), None);
    assert_eq!(grid.get_a1("A2"), None);
    assert_eq!(grid.get_a1("A3"), Some(&CellScalar::Text("only".into())));
}

#[test]
fn numeric_and_text_cells_coexist_in_one_grid() {
    let bytes = WorkbookBuilder::new()
        .sheet("S")
        .number("A1", 42.0)
        .text("B1", "hello")
        .build();
    let mut container = open(bytes);
    let model = load_workbook_model(&mut container).expect("model");
    let grid = load_cell_grid(&mut container, "S", 1, &model.shared).expect("grid");
    assert_eq!(grid.get_a1("A1"), Some(&CellScalar::Number(42.0)));
    assert_eq!(grid.get_a1("B1"), Some(&CellScalar::Text("hello".into())));
    assert_eq!(grid.len(), 2);
}

#[test]
fn drawing_texts_collect_across_every_drawing_part() {
    let bytes = WorkbookBuilder::new()
        .sheet("S")
        .drawing(&["first box", ""])
        .drawing(&["second part"])
        .build();
    let mut container = open(bytes);
    let texts = load_drawing_texts(&mut container).expect("texts");
    assert_eq!(texts, ["first box", "", "second part"]);
}

#[test]
fn workbook_without_drawings_has_no_texts() {
    let bytes = WorkbookBuilder::new().sheet("S").build();
    let mut container = open(bytes);
    assert!(load_drawing_texts(&mut container).expect("texts").is_empty());
}

#[test]
fn zip_without_content_types_is_not_a_package() {
    let bytes = common::build_zip(&[("readme.txt".to_string(), b"hi".to_vec())]);
    let err = OpcContainer::open_from_reader(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, ContainerError::NotOpcPackage));
}

#[test]
fn entry_count_over_the_limit_is_rejected_at_open() {
    let bytes = WorkbookBuilder::new().sheet("S").build();
    let limits = ContainerLimits {
        max_entries: 1,
        ..ContainerLimits::default()
    };
    let err = OpcContainer::open_from_reader_with_limits(Cursor::new(bytes), limits).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::TooManyEntries { max_entries: 1, .. }
    ));
}

#[test]
fn oversized_part_is_rejected_on_read() {
    let bytes = WorkbookBuilder::new().sheet("S").build();
    let limits = ContainerLimits {
        max_part_uncompressed_bytes: 8,
        ..ContainerLimits::default()
    };
    let mut container =
        OpcContainer::open_from_reader_with_limits(Cursor::new(bytes), limits).expect("open");
    let err = container.read_part("xl/workbook.xml").unwrap_err();
    assert!(matches!(err, ContainerError::PartTooLarge { .. }));
}

#[test]
fn garbage_bytes_are_not_a_zip_container() {
    let err = OpcContainer::open_from_reader(Cursor::new(b"not a zip".to_vec())).unwrap_err();
    assert!(matches!(err, ContainerError::NotZipContainer));
}
