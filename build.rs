use vergen_gitcl::{Build, Emitter, Gitcl};

// Feeds `version::BuildInfo`; outside a git checkout the values fall back to "unknown".
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let git = Gitcl::builder().branch(true).sha(true).dirty(true).build();

    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&git)?
        .emit()?;

    Ok(())
}
