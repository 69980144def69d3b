use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use arrowcast_json::{JsonReadOptions, JsonReadResult, read_json};
use arrowcast_table::Limits;

fn convert(data: &str) -> JsonReadResult {
    convert_with(data, &JsonReadOptions::default())
}

fn convert_with(data: &str, options: &JsonReadOptions) -> JsonReadResult {
    read_json(data.as_bytes(), options).expect("read json")
}

fn with_limits(limits: Limits) -> JsonReadOptions {
    JsonReadOptions { limits }
}

fn strings(batch: &RecordBatch, i: usize) -> Vec<Option<String>> {
    batch
        .column(i)
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("string column")
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn render(result: &JsonReadResult, options: &JsonReadOptions) -> String {
    result.warnings.render(&options.limits)
}

#[test]
fn record_array_becomes_columns() {
    let result = convert(r#"[{"x": "a", "y": "b"}, {"x": "c", "y": "d"}]"#);
    let batch = &result.batch;
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(0).name(), "x");
    assert_eq!(batch.schema().field(1).name(), "y");
    assert_eq!(strings(batch, 0), vec![Some("a".into()), Some("c".into())]);
    assert_eq!(strings(batch, 1), vec![Some("b".into()), Some("d".into())]);
    assert_eq!(render(&result, &JsonReadOptions::default()), "");
}

#[test]
fn int_column_stays_int64() {
    let result = convert(r#"[{"x": 1}, {"x": -2000000}, {"x": 35184372088832}]"#);
    let ints = result
        .batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("int64 column");
    assert_eq!(ints.values().as_ref(), &[1, -2_000_000, 35_184_372_088_832]);
}

#[test]
fn missing_keys_are_null() {
    let result = convert(r#"[{"x": "a"}, {"y": "b"}]"#);
    let batch = &result.batch;
    assert_eq!(strings(batch, 0), vec![Some("a".into()), None]);
    assert_eq!(strings(batch, 1), vec![None, Some("b".into())]);
}

#[test]
fn type_demotion_to_string_warns() {
    let options = JsonReadOptions::default();
    let result = convert(r#"[{"x":1},{"x":2},{"x":"three"}]"#);
    assert_eq!(result.batch.schema().field(0).data_type(), &DataType::Utf8);
    assert_eq!(
        strings(&result.batch, 0),
        vec![Some("1".into()), Some("2".into()), Some("three".into())]
    );
    assert_eq!(
        render(&result, &options),
        "interpreted 2 Numbers as String; see row 0 column x\n"
    );
}

#[test]
fn int_then_float_becomes_float64_without_lossy_warning() {
    // 1 round-trips exactly, so no lossy warning.
    let result = convert(r#"[{"n":1},{"n":2.5}]"#);
    let floats = result
        .batch
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("float64 column");
    assert_eq!(floats.values().as_ref(), &[1.0, 2.5]);
    assert_eq!(render(&result, &JsonReadOptions::default()), "");
}

#[test]
fn lossy_int_to_float_is_reported() {
    // 2^53 + 1 does not round-trip through f64.
    let options = JsonReadOptions::default();
    let result = convert(r#"[{"n":9007199254740993},{"n":1.0}]"#);
    assert_eq!(
        result.batch.schema().field(0).data_type(),
        &DataType::Float64
    );
    assert_eq!(
        render(&result, &options),
        "lost precision converting 1 int64 Numbers to float64; see row 0 column n\n"
    );
}

#[test]
fn byte_total_limit_keeps_leading_rows() {
    // Ten 1 KiB values against a 4 KiB budget keep four rows.
    let value = "a".repeat(1024);
    let rows: Vec<String> = (0..10).map(|_| format!(r#"{{"x":"{value}"}}"#)).collect();
    let data = format!("[{}]", rows.join(","));
    let options = with_limits(Limits {
        max_bytes_total: 4096,
        ..Limits::default()
    });
    let result = convert_with(&data, &options);
    assert_eq!(result.batch.num_rows(), 4);
    assert_eq!(
        render(&result, &options),
        "stopped at limit of 4096 bytes of data\n"
    );
}

#[test]
fn scalar_root_warns_bad_root() {
    let options = JsonReadOptions::default();
    let result = convert_with("123", &options);
    assert_eq!(result.batch.num_columns(), 0);
    assert_eq!(
        render(&result, &options),
        "JSON is not an Array or Object containing an Array; got: 123\n"
    );
}

#[test]
fn string_root_snippet_is_json_quoted() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#""hello""#, &options);
    assert_eq!(
        render(&result, &options),
        "JSON is not an Array or Object containing an Array; got: \"hello\"\n"
    );
}

#[test]
fn root_object_array_child_becomes_records() {
    let result = convert(r#"{"meta": 1, "rows": [{"x": "a"}], "later": [{"x": "z"}]}"#);
    // Only the first array child is the record array.
    assert_eq!(result.batch.num_rows(), 1);
    assert_eq!(strings(&result.batch, 0), vec![Some("a".into())]);
}

#[test]
fn non_object_records_are_skipped_with_snippet() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[123, {"x": "a"}]"#, &options);
    // Invalid items are reported, not stored; they do not occupy a row.
    assert_eq!(result.batch.num_rows(), 1);
    assert_eq!(strings(&result.batch, 0), vec![Some("a".into())]);
    assert_eq!(
        render(&result, &options),
        "skipped 1 non-Object records; example Array item 0: 123\n"
    );
}

#[test]
fn nested_array_record_is_serialized_into_the_warning() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[[1,{"x":["y"]},4]]"#, &options);
    // Container openers inside the snippet do not get a separating comma;
    // the snippet is a best-effort description, not round-trippable JSON.
    assert_eq!(
        render(&result, &options),
        "skipped 1 non-Object records; example Array item 0: [1{\"x\":[\"y\"]},4]\n"
    );
}

#[test]
fn nested_values_store_as_serialized_json() {
    let result = convert(r#"[{"x": {"a": 1, "b": [true, null]}}]"#);
    assert_eq!(
        strings(&result.batch, 0),
        vec![Some(r#"{"a":1,"b":[true,null]}"#.into())]
    );
}

#[test]
fn bools_and_nulls_in_records() {
    let result = convert(r#"[{"x": true}, {"x": null}, {"x": false}]"#);
    assert_eq!(
        strings(&result.batch, 0),
        vec![Some("true".into()), None, Some("false".into())]
    );
}

#[test]
fn long_nested_value_truncates_with_warning() {
    let options = with_limits(Limits {
        max_bytes_per_value: 8,
        ..Limits::default()
    });
    let result = convert_with(r#"[{"A": [1111,2222,3333]}]"#, &options);
    assert_eq!(strings(&result.batch, 0), vec![Some("[1111,22".into())]);
    assert_eq!(
        render(&result, &options),
        "truncated 1 values (value byte limit is 8; see row 0 column A)\n"
    );
}

#[test]
fn long_string_value_truncates_with_warning() {
    let options = with_limits(Limits {
        max_bytes_per_value: 3,
        ..Limits::default()
    });
    let result = convert_with(r#"[{"A": "abcdef"}, {"A": "xy"}]"#, &options);
    assert_eq!(
        strings(&result.batch, 0),
        vec![Some("abc".into()), Some("xy".into())]
    );
    assert_eq!(
        render(&result, &options),
        "truncated 1 values (value byte limit is 3; see row 0 column A)\n"
    );
}

#[test]
fn duplicate_keys_keep_the_first_value() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[{"x": 1, "x": 2}]"#, &options);
    let ints = result
        .batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("int64");
    assert_eq!(ints.value(0), 1);
    assert_eq!(
        render(&result, &options),
        "ignored duplicate column x starting at row 0\n"
    );
}

#[test]
fn duplicate_null_keys_are_detected() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[{"x": null, "x": null}]"#, &options);
    assert_eq!(
        render(&result, &options),
        "ignored duplicate column x starting at row 0\n"
    );
}

#[test]
fn invalid_column_names_are_ignored() {
    let options = JsonReadOptions::default();
    let result = convert_with("[{\"\\n\": 1, \"\": 2, \"ok\": 3}]", &options);
    assert_eq!(result.batch.num_columns(), 1);
    assert_eq!(result.batch.schema().field(0).name(), "ok");
    assert_eq!(
        render(&result, &options),
        "ignored invalid column \"\\n\" and more\n"
    );
}

#[test]
fn long_column_names_truncate_and_collide() {
    let options = with_limits(Limits {
        max_bytes_per_column_name: 2,
        ..Limits::default()
    });
    let result = convert_with(r#"[{"xyz": 1, "xyw": 2}]"#, &options);
    assert_eq!(result.batch.num_columns(), 1);
    assert_eq!(result.batch.schema().field(0).name(), "xy");
    assert_eq!(
        render(&result, &options),
        "truncated 1 column names; example xy\n\
         ignored duplicate column xy starting at row 0\n"
    );
}

#[test]
fn rows_past_limit_are_counted() {
    let options = with_limits(Limits {
        max_rows: 1,
        ..Limits::default()
    });
    let result = convert_with(r#"[{"x": "a"}, {"x": "b"}, {"x": "c"}]"#, &options);
    assert_eq!(result.batch.num_rows(), 1);
    assert_eq!(strings(&result.batch, 0), vec![Some("a".into())]);
    assert_eq!(
        render(&result, &options),
        "skipped 2 rows (after row limit of 1)\n"
    );
}

#[test]
fn columns_past_limit_are_skipped() {
    let options = with_limits(Limits {
        max_columns: 2,
        ..Limits::default()
    });
    let result = convert_with(r#"[{"x": 1, "y": 2, "z": 3}, {"w": 4}]"#, &options);
    assert_eq!(result.batch.num_columns(), 2);
    assert_eq!(
        render(&result, &options),
        "skipped column z and more (after column limit of 2)\n"
    );
}

#[test]
fn syntax_error_keeps_clean_prefix() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[{"x": "a"}, {"x": }]"#, &options);
    assert_eq!(result.batch.num_rows(), 1);
    assert_eq!(strings(&result.batch, 0), vec![Some("a".into())]);
    let report = render(&result, &options);
    assert!(
        report.starts_with("JSON parse error at byte 19: "),
        "got: {report}"
    );
}

#[test]
fn all_null_column_defaults_to_string_with_warning() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[{"x": null}, {"x": null}]"#, &options);
    assert_eq!(result.batch.schema().field(0).data_type(), &DataType::Utf8);
    assert_eq!(
        render(&result, &options),
        "chose string type for null column x\n"
    );
}

#[test]
fn float_overflow_literal_becomes_null() {
    let options = JsonReadOptions::default();
    let result = convert_with(r#"[{"x": 1.1}, {"x": 11e400}]"#, &options);
    let floats = result
        .batch
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("float64");
    assert_eq!(floats.value(0), 1.1);
    assert!(floats.is_null(1));
    assert_eq!(
        render(&result, &options),
        "replaced infinity with null for 1 Numbers; see row 1 column x\n"
    );
}

#[test]
fn empty_array_yields_empty_table() {
    let result = convert("[]");
    assert_eq!(result.batch.num_columns(), 0);
    assert_eq!(result.batch.num_rows(), 0);
}
