// Shared fixtures for the pipeline tests

pub use playgrab_lib::downloader::testing::FakeHttp;

/// svtplay page with the given page state embedded
#[allow(dead_code)]
pub fn svtplay_page(state: &str) -> String {
    format!(
        "<html><body><script>window['__svtplay'] = {};</script></body></html>",
        state.replace('\n', "")
    )
}
