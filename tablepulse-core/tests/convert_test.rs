use arrow::array::{Array, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use tablepulse_common::ConvertConfig;
use tablepulse_core::convert_dir;

fn cfg(input: &Path, output: &Path, chunk_size: usize) -> ConvertConfig {
    ConvertConfig {
        input_folder: input.to_path_buf(),
        output_folder: output.to_path_buf(),
        chunk_size,
        skip_existing: true,
    }
}

fn read_row_count(path: &Path) -> (usize, usize) {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap()).unwrap();
    let row_groups = builder.metadata().num_row_groups();
    let rows: usize = builder
        .build()
        .unwrap()
        .map(|b| b.unwrap().num_rows())
        .sum();
    (rows, row_groups)
}

#[test]
fn converts_csv_and_conserves_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    let mut csv = String::from("id,amount,flag\n");
    for i in 0..10 {
        csv.push_str(&format!("{i},{}.5,x{i}\n", i * 2));
    }
    std::fs::write(input.join("orders.csv"), csv).unwrap();

    let outputs = convert_dir(&cfg(&input, &output, 4)).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].file_name().unwrap(), "orders.parquet.gz");

    let (rows, row_groups) = read_row_count(&outputs[0]);
    assert_eq!(rows, 10);
    assert_eq!(row_groups, 3); // one row group per 4-row chunk: 4/4/2
}

#[test]
fn skip_existing_does_not_touch_input_or_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(input.join("orders.csv"), "id\n1\n").unwrap();
    std::fs::write(output.join("orders.parquet.gz"), b"sentinel").unwrap();

    let outputs = convert_dir(&cfg(&input, &output, 100)).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(
        std::fs::read(&outputs[0]).unwrap(),
        b"sentinel" // untouched: skip decided on existence alone
    );
}

#[test]
fn skip_existing_off_rewrites_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(input.join("orders.csv"), "id\n1\n2\n").unwrap();
    std::fs::write(output.join("orders.parquet.gz"), b"sentinel").unwrap();

    let mut cfg = cfg(&input, &output, 100);
    cfg.skip_existing = false;
    let outputs = convert_dir(&cfg).unwrap();
    let (rows, _) = read_row_count(&outputs[0]);
    assert_eq!(rows, 2);
}

#[test]
fn latin1_input_is_detected_and_decoded() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    // "crème brûlée" etc. encoded as Latin-1; invalid as UTF-8
    let mut bytes = b"dessert,origin\n".to_vec();
    for _ in 0..40 {
        bytes.extend_from_slice(b"cr\xE8me br\xFBl\xE9e,caf\xE9 fran\xE7ais\n");
        bytes.extend_from_slice(b"p\xE2tisserie,boulangerie d\xE9licieuse\n");
    }
    std::fs::write(input.join("menu.csv"), &bytes).unwrap();

    let outputs = convert_dir(&cfg(&input, &output, 1000)).unwrap();
    assert_eq!(outputs.len(), 1);

    let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&outputs[0]).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let batch = reader.next().unwrap().unwrap();
    let desserts = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(desserts.value(0), "crème brûlée");
}

#[test]
fn empty_input_dir_yields_empty_result() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    let outputs = convert_dir(&cfg(&input, &output, 100)).unwrap();
    assert!(outputs.is_empty());
}

#[test]
fn malformed_file_is_skipped_others_continue() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("raw");
    let output = tmp.path().join("columnar");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("bad.csv"), "a,b\n1\n2,3,4\n").unwrap();
    std::fs::write(input.join("good.csv"), "id\n1\n2\n3\n").unwrap();

    let outputs = convert_dir(&cfg(&input, &output, 100)).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].file_name().unwrap(), "good.parquet.gz");
    assert!(!output.join("bad.parquet.gz").exists());
    assert!(!output.join("bad.parquet.gz.tmp").exists());
}
