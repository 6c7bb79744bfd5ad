use super::Browser;
use anyhow::Result;
use tracing::debug;

#[derive(Debug, Default)]
pub struct DetachedBrowser;

impl Browser for DetachedBrowser {
    fn open_course_page(&self, course_id: &str, subject_id: &str) -> Result<()> {
        debug!("detached: skip opening course {course_id} in subject {subject_id}");
        Ok(())
    }

    fn refresh_and_resume_playback(&self) -> Result<()> {
        debug!("detached: skip refresh");
        Ok(())
    }

    fn navigate_home(&self) -> Result<()> {
        debug!("detached: skip navigate home");
        Ok(())
    }
}
