//! Query command - run a federated query and print one page

use crate::cli::output::{self, colors};
use crate::cli::OutputFormat;
use crate::core::assembler::Excerpt;
use crate::core::services::Services;
use crate::core::types::{
    BackendId, CallerContext, CollectionId, DomainRecord, ResultPage, SearchMode, SearchOptions,
    SortOrder, StatusFilter, UserId,
};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::sync::Arc;

/// Sort direction accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrderArg {
    Asc,
    #[default]
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Query text (terms, "phrases", AND/OR/EXCEPT, IN, field:term)
    #[arg(default_value = "")]
    pub text: String,

    /// Authenticated user id
    #[arg(long, short = 'u', default_value = "1")]
    pub user: UserId,

    /// Page number (1-based)
    #[arg(long, short = 'p', default_value = "1")]
    pub page: usize,

    /// Results per page (0 = configured default)
    #[arg(long, default_value = "0")]
    pub per_page: usize,

    /// Backends to search (default: all)
    #[arg(long = "backend", short = 'b')]
    pub backends: Vec<BackendId>,

    /// Authorized collections (default: all)
    #[arg(long = "collection", short = 'c')]
    pub collections: Vec<CollectionId>,

    /// Restrict matching to these fields
    #[arg(long = "field", short = 'f')]
    pub fields: Vec<String>,

    /// Date fields used by --min-date/--max-date (default: all date fields)
    #[arg(long = "date-field")]
    pub date_fields: Vec<String>,

    /// Lower date bound (YYYY-MM-DD)
    #[arg(long)]
    pub min_date: Option<NaiveDate>,

    /// Upper date bound (YYYY-MM-DD)
    #[arg(long)]
    pub max_date: Option<NaiveDate>,

    /// Require a status bit, as BIT:BACKEND:0|1 (bits below 4 are ignored)
    #[arg(long = "status", value_parser = parse_status)]
    pub status: Vec<(u32, BackendId, bool)>,

    /// Sort field
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction
    #[arg(long, value_enum, default_value = "desc")]
    pub order: OrderArg,

    /// Enable stemming
    #[arg(long)]
    pub stemming: bool,

    /// Locale for stemming and messages (default: configured locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Restrict to one record type
    #[arg(long)]
    pub record_type: Option<String>,

    /// Search record groups (stories) only
    #[arg(long)]
    pub group: bool,

    /// Collections where business fields are searchable
    #[arg(long = "business")]
    pub business: Vec<CollectionId>,

    /// Print highlighted values of these fields for each record
    #[arg(long = "excerpt", short = 'e')]
    pub excerpt: Vec<String>,
}

fn parse_status(value: &str) -> Result<(u32, BackendId, bool), String> {
    let parts: Vec<&str> = value.split(':').collect();
    let [bit, backend, flag] = parts.as_slice() else {
        return Err(format!("expected BIT:BACKEND:0|1, got '{value}'"));
    };
    let bit = bit.parse().map_err(|_| format!("invalid bit '{bit}'"))?;
    let backend = backend
        .parse()
        .map_err(|_| format!("invalid backend '{backend}'"))?;
    let flag = match *flag {
        "0" => false,
        "1" => true,
        other => return Err(format!("status value must be 0 or 1, got '{other}'")),
    };
    Ok((bit, backend, flag))
}

impl QueryArgs {
    /// Build search options, falling back to configured defaults
    pub fn options(&self, default_locale: &str, date_fields: Vec<String>) -> SearchOptions {
        let status = self
            .status
            .iter()
            .fold(StatusFilter::new(), |filter, &(bit, backend, flag)| {
                filter.require(bit, backend, flag)
            });

        let date_fields = if self.date_fields.is_empty() {
            date_fields
        } else {
            self.date_fields.clone()
        };

        SearchOptions {
            record_type: self.record_type.clone(),
            backends: self.backends.clone(),
            collections: self.collections.clone(),
            fields: self.fields.clone(),
            status,
            sort_by: self.sort_by.clone(),
            sort_order: self.order.into(),
            stemming: self.stemming,
            locale: self
                .locale
                .clone()
                .unwrap_or_else(|| default_locale.to_string()),
            search_mode: if self.group {
                SearchMode::RecordGroup
            } else {
                SearchMode::Document
            },
            business_fields_on: self.business.clone(),
            ..SearchOptions::new()
        }
        .with_date_range(date_fields, self.min_date, self.max_date)
    }
}

/// One printed record
#[derive(Debug, Serialize)]
pub struct QueryRecord {
    #[serde(flatten)]
    pub record: DomainRecord,
    #[serde(skip_serializing_if = "Excerpt::is_empty")]
    pub excerpt: Excerpt,
}

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub query: String,
    pub session: Option<String>,
    pub page: usize,
    pub per_page: usize,
    pub offset: usize,
    pub total: u64,
    pub duration: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub records: Vec<QueryRecord>,
    pub suggestions: Vec<crate::core::types::Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposals: Option<String>,
}

/// Execute the query command
pub async fn execute(
    args: QueryArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = run_query(&args, services)?;

    match format {
        OutputFormat::Human => print_human(&output),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run the query and collect everything that gets printed
pub fn run_query(
    args: &QueryArgs,
    services: &Services,
) -> Result<QueryOutput, Box<dyn std::error::Error>> {
    let engine = &services.engine;
    let per_page = match args.per_page {
        0 => services.config.search.default_per_page,
        n => n.min(services.config.search.max_per_page),
    };
    let offset = args
        .page
        .saturating_sub(1)
        .checked_mul(per_page)
        .ok_or_else(|| format!("page {} is out of range", args.page))?;

    let options = args.options(
        &services.config.search.default_locale,
        engine.available_date_fields(),
    );
    let mut ctx = CallerContext::for_user(args.user);
    let page: ResultPage = engine.query(&mut ctx, &args.text, offset, per_page, &options)?;

    let mut records = Vec::with_capacity(page.records.len());
    for record in &page.records {
        let excerpt = if args.excerpt.is_empty() {
            Excerpt::new()
        } else {
            engine.excerpt(&ctx, record, &args.excerpt)?
        };
        records.push(QueryRecord {
            record: record.clone(),
            excerpt,
        });
    }

    Ok(QueryOutput {
        query: page.query,
        session: ctx.session_id,
        page: args.page.max(1),
        per_page,
        offset,
        total: page.total,
        duration: page.duration,
        error: page.error,
        records,
        suggestions: page.suggestions,
        proposals: page.proposals,
    })
}

fn print_human(output: &QueryOutput) {
    if !output.error.is_empty() {
        output::print_error(&output.error);
        return;
    }

    println!(
        "{} {}",
        colors::label("Query:"),
        colors::dim(&output.query)
    );

    if output.records.is_empty() {
        println!(
            "No results on page {} ({} total)",
            colors::number(&output.page.to_string()),
            colors::number(&output.total.to_string())
        );
    } else {
        println!(
            "Showing {}-{} of {} result(s) in {}:\n",
            colors::number(&(output.offset + 1).to_string()),
            colors::number(&(output.offset + output.records.len()).to_string()),
            colors::number(&output.total.to_string()),
            output::format_duration_colored(output.duration)
        );

        for item in &output.records {
            let record = &item.record;
            println!(
                "[{}] {} {}",
                colors::rank(&(record.rank + 1).to_string()),
                record.title.as_deref().unwrap_or("(untitled)"),
                colors::dim(&format!(
                    "(backend {}, collection {}, record {}, {:?})",
                    record.backend_id, record.collection_id, record.record_id, record.kind
                ))
            );
            for (field, values) in &item.excerpt {
                for value in values.values() {
                    println!("    {}: {}", colors::label(field), value);
                }
            }
        }
    }

    if !output.suggestions.is_empty() {
        println!("\n{}", colors::label("Suggestions:"));
        for suggestion in &output.suggestions {
            println!(
                "  {} -> {} {}",
                suggestion.original_term,
                colors::success(&suggestion.proposed_value),
                colors::dim(&format!("({})", suggestion.hit_count))
            );
        }
    }

    if let Some(session) = &output.session {
        println!(
            "\n{} {}",
            colors::dim("Session:"),
            colors::session_id(session)
        );
    }
}
