fn main() -> anyhow::Result<()> {
    blobbench::cli::execute()
}
