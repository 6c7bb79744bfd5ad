pub mod detached;
pub mod webdriver;

use anyhow::Result;

pub use detached::DetachedBrowser;
pub use webdriver::WebDriverBrowser;

pub trait Browser {
    fn open_course_page(&self, course_id: &str, subject_id: &str) -> Result<()>;
    fn refresh_and_resume_playback(&self) -> Result<()>;
    fn navigate_home(&self) -> Result<()>;
}
