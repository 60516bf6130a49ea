use anyhow::Context;

fn main() -> anyhow::Result<()> {
    skolarin_theme::run().context("skolarin-theme failed")
}
