//! Suggestions and the proposal panel derived from compiler metadata.

use crate::core::i18n::{Message, Translator};
use crate::core::query::compiler::escape_html;
use crate::core::query::{CompiledRequest, Proposals};
use crate::core::types::Suggestion;

const FIRST_HEADING_STYLE: &str = " style=\"margin-top:0px;\"";

pub struct SuggestionBuilder {
    translator: Translator,
}

impl SuggestionBuilder {
    pub fn new(translator: Translator) -> Self {
        Self { translator }
    }

    /// One suggestion per distinct proposed value, in proposal order.
    /// Empty when the combined query did not compile.
    pub fn suggestions(&self, request: &CompiledRequest) -> Vec<Suggestion> {
        if request.main.is_none() {
            return Vec::new();
        }
        request
            .proposals
            .queries
            .iter()
            .map(|q| Suggestion {
                original_term: q.term.clone(),
                proposed_value: q.value.clone(),
                hit_count: q.hits,
            })
            .collect()
    }

    /// Rendered panel, `None` when it would carry no content
    pub fn panel(&self, request: &CompiledRequest) -> Option<String> {
        request.main.as_ref()?;

        let body = self.render_groups(&request.proposals);
        if body.trim().is_empty() {
            return None;
        }
        Some(format!(
            "<div style='height:0px; overflow:hidden'>{}</div><div class='proposals'>{}</div>",
            escape_html(&request.proposals.query),
            body
        ))
    }

    fn render_groups(&self, proposals: &Proposals) -> String {
        let mut html = String::new();
        let several = proposals.groups.len() > 1;
        let mut first_group = true;

        for group in &proposals.groups {
            if several && !group.terms.is_empty() {
                let style = if first_group { FIRST_HEADING_STYLE } else { "" };
                first_group = false;
                html.push_str(&format!(
                    "<h1{style}>{}</h1>",
                    escape_html(
                        &self
                            .translator
                            .trans(&Message::ProposalsForBackend(&group.name))
                    )
                ));
            }

            let mut first_term = true;
            for term in &group.terms {
                let style = if first_term { FIRST_HEADING_STYLE } else { "" };
                first_term = false;
                html.push_str(&format!(
                    "<h2{style}>{}</h2>",
                    escape_html(&self.translator.trans(&Message::ProposalsForTerm(&term.term)))
                ));
                html.push_str(&term.markup);
            }
        }

        html
    }
}
