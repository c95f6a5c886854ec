/// Arrow schema definitions for the case-document interchange format.
pub mod caselaw {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema of the case-document Parquet supplied by the document
    /// source. Field names follow the upstream registry (Spanish).
    pub fn case_document_schema() -> Schema {
        Schema::new(vec![
            Field::new("tribunal", DataType::Utf8, false),
            Field::new("fecha", DataType::Date32, false),
            Field::new("materia", DataType::Utf8, false),
            Field::new("partes", DataType::Utf8, true),
            Field::new("expediente", DataType::Utf8, false),
            Field::new("full_text", DataType::Utf8, false),
            Field::new("url", DataType::Utf8, true),
        ])
    }
}
