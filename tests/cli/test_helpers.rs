//! CLI test helpers
//!
//! Default argument builders matching the clap defaults, so each test only
//! spells out what it changes.

use fedsearch::cli::commands::query::{OrderArg, QueryArgs};

/// Query arguments as parsed from `fedsearch query <text>`
pub fn query_args(text: &str) -> QueryArgs {
    QueryArgs {
        text: text.to_string(),
        user: 1,
        page: 1,
        per_page: 0,
        backends: vec![],
        collections: vec![],
        fields: vec![],
        date_fields: vec![],
        min_date: None,
        max_date: None,
        status: vec![],
        sort_by: None,
        order: OrderArg::Desc,
        stemming: false,
        locale: None,
        record_type: None,
        group: false,
        business: vec![],
        excerpt: vec![],
    }
}
