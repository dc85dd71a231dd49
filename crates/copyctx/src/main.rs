fn main() -> anyhow::Result<()> {
    copyctx::init();

    copyctx::cli::run()
}
