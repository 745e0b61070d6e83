fn main() -> anyhow::Result<()> {
    capturebar_lib::run()
}
