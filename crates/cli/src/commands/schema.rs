use anyhow::Result;
use runnel_core::configs::tasks::tasks_schema;

pub fn execute() -> Result<()> {
    println!("{}", tasks_schema()?);
    Ok(())
}
