// this stub keeps the binary thin so that all of the app logic
// lives in the library crate and can be reused by other hosts.
fn main() -> anyhow::Result<()> {
    inline_image::app::app_main()
}
