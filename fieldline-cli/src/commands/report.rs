//! Report command - post-import report of a finished batch

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(batch_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let report = ctx.report_service.post_import(batch_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_post_report(&report);
    }
    Ok(())
}
