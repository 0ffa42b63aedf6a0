//! Index schema definition.

use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};

/// Field name of the exact-match path key.
pub const PATH_STRING: &str = "path_string";
/// Field name of the tokenized file contents.
pub const CONTENTS: &str = "contents";

/// Schema with field handles for the two-field document layout.
///
/// `path_string` is raw-tokenized (the whole absolute path is a single term)
/// and stored; it doubles as the unique update key. `contents` is tokenized
/// with the default analyzer, stored, and indexed with frequencies and
/// positions so result assembly can explain scores and count terms.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    pub schema: Schema,
    pub path_string: Field,
    pub contents: Field,
}

impl IndexSchema {
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let path_string = builder.add_text_field(PATH_STRING, STRING | STORED);

        let contents_options = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("default")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let contents = builder.add_text_field(CONTENTS, contents_options);

        Self {
            schema: builder.build(),
            path_string,
            contents,
        }
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}
