use std::collections::BTreeMap;

use crate::pipeline::PipelineResult;
use crate::tracker::Outcome;

/// Render the end-of-run summary as a plain-text table.
pub fn render(outcomes: &BTreeMap<String, Outcome>, results: &[PipelineResult]) -> String {
    let repo_width = outcomes
        .keys()
        .map(String::len)
        .chain(std::iter::once("REPOSITORY".len()))
        .max()
        .unwrap_or(0);
    let outcome_width = outcomes
        .values()
        .map(|o| o.label().len())
        .chain(std::iter::once("OUTCOME".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:repo_width$}  {:outcome_width$}  DETAIL\n",
        "REPOSITORY", "OUTCOME"
    ));

    for (name, outcome) in outcomes {
        let detail = outcome
            .detail()
            .or_else(|| pull_request_url(results, name))
            .unwrap_or_default();
        out.push_str(&format!(
            "{name:repo_width$}  {:outcome_width$}  {detail}\n",
            outcome.label()
        ));
    }

    let failed = outcomes.values().filter(|o| o.is_failure()).count();
    out.push_str(&format!(
        "\n{} repositories processed, {failed} failed\n",
        outcomes.len()
    ));

    out
}

pub fn print_summary(outcomes: &BTreeMap<String, Outcome>, results: &[PipelineResult]) {
    print!("{}", render(outcomes, results));
}

fn pull_request_url(results: &[PipelineResult], repo_full_name: &str) -> Option<String> {
    results
        .iter()
        .find(|r| r.repo.full_name() == repo_full_name)
        .and_then(|r| r.pull_request.as_ref())
        .and_then(|pr| pr.url.clone())
}
