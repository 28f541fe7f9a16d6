//! Gesture-driven document browser
//!
//! A two-level menu: pick a document category, then pick a file. The index
//! fingertip is the cursor, a pinch selects, and the listing is written to the
//! log as feedback.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::actions::automation::{AutomationSink, Key};
use crate::config::BrowserSettings;
use crate::gesture::Point;

/// Browser request from a confirmed gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileIntent {
    /// Activate the row under the cursor
    Select,
    /// Return to the category menu
    Back,
    /// Close the last opened file
    Close,
}

/// Collaborator that owns file navigation while FileOpening is active
pub trait FileBrowser {
    /// Show the category menu for `root`
    fn start(&mut self, root: &Path);
    /// Leave the browser
    fn stop(&mut self);
    /// Update the pointing cursor (normalized frame coordinates)
    fn point(&mut self, cursor: Point, sink: &mut dyn AutomationSink);
    /// Apply a confirmed intent
    fn handle(&mut self, intent: FileIntent, sink: &mut dyn AutomationSink);
}

/// Document category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Word,
    Ppt,
    Excel,
    Pdf,
}

impl FileCategory {
    /// Menu order
    pub const ALL: [FileCategory; 4] = [
        FileCategory::Word,
        FileCategory::Ppt,
        FileCategory::Excel,
        FileCategory::Pdf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FileCategory::Word => "Word",
            FileCategory::Ppt => "PPT",
            FileCategory::Excel => "Excel",
            FileCategory::Pdf => "PDF",
        }
    }

    /// Lowercase extensions without the dot
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileCategory::Word => &["docx", "doc"],
            FileCategory::Ppt => &["pptx", "ppt"],
            FileCategory::Excel => &["xlsx", "xls"],
            FileCategory::Pdf => &["pdf"],
        }
    }

    /// Whether a path has one of this category's extensions (case-insensitive)
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

/// Recursively collect files of a category under `root`, sorted by path
pub fn find_files(root: &Path, category: FileCategory) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && category.matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Row layout in normalized frame coordinates (laid out on a 640x480 frame)
mod layout {
    use crate::gesture::Point;

    const FRAME_W: f32 = 640.0;
    const FRAME_H: f32 = 480.0;

    /// Category rows: label baseline at y = 40 + 80i, box from -30 to +10
    const MENU_X: (f32, f32) = (50.0, 280.0);
    const MENU_Y0: f32 = 40.0;
    const MENU_GAP: f32 = 80.0;

    /// File rows: baseline at y = 80 + 50i
    const FILE_X: (f32, f32) = (40.0, 640.0);
    const FILE_Y0: f32 = 80.0;
    const FILE_GAP: f32 = 50.0;

    fn row_at(p: Point, x: (f32, f32), y0: f32, gap: f32, rows: usize) -> Option<usize> {
        let (px, py) = (p.x * FRAME_W, p.y * FRAME_H);
        if px <= x.0 || px >= x.1 {
            return None;
        }
        (0..rows).find(|&i| {
            let baseline = y0 + i as f32 * gap;
            py > baseline - 30.0 && py < baseline + 10.0
        })
    }

    pub fn menu_row(p: Point, rows: usize) -> Option<usize> {
        row_at(p, MENU_X, MENU_Y0, MENU_GAP, rows)
    }

    pub fn file_row(p: Point, rows: usize) -> Option<usize> {
        row_at(p, FILE_X, FILE_Y0, FILE_GAP, rows)
    }

    /// Centre of a menu row, for tests and callers that place the cursor
    #[cfg(test)]
    pub fn menu_centre(i: usize) -> Point {
        Point::new(165.0 / FRAME_W, (MENU_Y0 + i as f32 * MENU_GAP - 10.0) / FRAME_H)
    }

    #[cfg(test)]
    pub fn file_centre(i: usize) -> Point {
        Point::new(320.0 / FRAME_W, (FILE_Y0 + i as f32 * FILE_GAP - 10.0) / FRAME_H)
    }
}

/// Where the browser currently is
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserState {
    Idle,
    Menu,
    Browse {
        category: FileCategory,
        files: Vec<PathBuf>,
    },
}

/// Opens a file with the platform handler
pub type Opener = Box<dyn FnMut(&Path) -> io::Result<()>>;

/// Browser over a directory tree
pub struct DirectoryBrowser {
    settings: BrowserSettings,
    root: PathBuf,
    state: BrowserState,
    /// Smoothed cursor
    cursor: Option<Point>,
    hovered: Option<usize>,
    last_opened: Option<PathBuf>,
    opener: Opener,
    /// Whether the OS pointer follows the cursor; cleared if the display is unknown
    os_cursor: bool,
    /// Main display size, queried on first pointer move
    screen: Option<(i32, i32)>,
}

impl DirectoryBrowser {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self::with_opener(settings, Box::new(|path: &Path| open::that(path)))
    }

    /// Browser with a custom file opener
    pub fn with_opener(settings: &BrowserSettings, opener: Opener) -> Self {
        Self {
            settings: settings.clone(),
            root: settings.root_dir(),
            state: BrowserState::Idle,
            cursor: None,
            hovered: None,
            last_opened: None,
            opener,
            os_cursor: settings.move_os_cursor,
            screen: None,
        }
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    pub fn last_opened(&self) -> Option<&Path> {
        self.last_opened.as_deref()
    }

    /// Number of selectable rows in the current state
    fn row_count(&self) -> usize {
        match &self.state {
            BrowserState::Idle => 0,
            BrowserState::Menu => FileCategory::ALL.len(),
            BrowserState::Browse { files, .. } => files.len().min(self.settings.per_page),
        }
    }

    fn row_under_cursor(&self) -> Option<usize> {
        let cursor = self.cursor?;
        let rows = self.row_count();
        match self.state {
            BrowserState::Idle => None,
            BrowserState::Menu => layout::menu_row(cursor, rows),
            BrowserState::Browse { .. } => layout::file_row(cursor, rows),
        }
    }

    fn row_label(&self, row: usize) -> String {
        match &self.state {
            BrowserState::Idle => String::new(),
            BrowserState::Menu => FileCategory::ALL
                .get(row)
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            BrowserState::Browse { files, .. } => files
                .get(row)
                .map(|f| display_name(f))
                .unwrap_or_default(),
        }
    }

    fn show_menu(&mut self) {
        self.state = BrowserState::Menu;
        self.hovered = None;
        log::info!("File menu (pinch a category):");
        for (i, category) in FileCategory::ALL.iter().enumerate() {
            log::info!("  {}. {}", i + 1, category.name());
        }
    }

    fn show_files(&mut self, category: FileCategory) {
        let files = find_files(&self.root, category);
        log::info!(
            "{} files under {} ({} found, showing {}):",
            category.name(),
            self.root.display(),
            files.len(),
            files.len().min(self.settings.per_page)
        );
        for (i, file) in files.iter().take(self.settings.per_page).enumerate() {
            log::info!("  {}. {}", i + 1, display_name(file));
        }
        if files.is_empty() {
            log::info!("  (none) make a back gesture to return");
        }
        self.state = BrowserState::Browse { category, files };
        self.hovered = None;
    }

    /// Place the OS pointer at the cursor, scaled to the main display
    fn move_os_cursor(&mut self, cursor: Point, sink: &mut dyn AutomationSink) {
        let (width, height) = match self.screen {
            Some(size) => size,
            None => match sink.screen_size() {
                Ok(size) => {
                    log::info!("Pointer control on a {}x{} display", size.0, size.1);
                    self.screen = Some(size);
                    size
                }
                Err(e) => {
                    log::warn!("Pointer control disabled: {}", e);
                    self.os_cursor = false;
                    return;
                }
            },
        };

        let x = ((cursor.x.clamp(0.0, 1.0) * width as f32) as i32).min(width - 1).max(0);
        let y = ((cursor.y.clamp(0.0, 1.0) * height as f32) as i32).min(height - 1).max(0);
        if let Err(e) = sink.move_cursor(x, y) {
            log::debug!("Pointer move failed: {}", e);
        }
    }

    fn select(&mut self, sink: &mut dyn AutomationSink) {
        let Some(row) = self.row_under_cursor() else {
            if self.os_cursor {
                match sink.click() {
                    Ok(()) => log::info!("Click"),
                    Err(e) => log::warn!("Click failed: {}", e),
                }
            } else {
                log::info!("Nothing under the cursor");
            }
            return;
        };

        match &self.state {
            BrowserState::Idle => {}
            BrowserState::Menu => {
                let category = FileCategory::ALL[row];
                self.show_files(category);
            }
            BrowserState::Browse { files, .. } => {
                let path = files[row].clone();
                match (self.opener)(&path) {
                    Ok(()) => {
                        log::info!("Opened {}", path.display());
                        self.last_opened = Some(path);
                        self.show_menu();
                    }
                    Err(e) => log::warn!("Failed to open {}: {}", path.display(), e),
                }
            }
        }
    }

    /// Alt+F4 reaches the focused window, assumed to be the last opened file
    fn close(&mut self, sink: &mut dyn AutomationSink) {
        let Some(path) = self.last_opened.take() else {
            log::info!("No opened file to close");
            return;
        };
        match sink.key_chord(&[Key::Alt], Key::F4) {
            Ok(()) => log::info!("Closed {}", display_name(&path)),
            Err(e) => log::warn!("Failed to close {}: {}", display_name(&path), e),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl FileBrowser for DirectoryBrowser {
    fn start(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.cursor = None;
        self.show_menu();
    }

    fn stop(&mut self) {
        self.state = BrowserState::Idle;
        self.cursor = None;
        self.hovered = None;
    }

    fn point(&mut self, cursor: Point, sink: &mut dyn AutomationSink) {
        let alpha = self.settings.cursor_smoothing;
        let smoothed = match self.cursor {
            Some(prev) => Point::new(
                prev.x + alpha * (cursor.x - prev.x),
                prev.y + alpha * (cursor.y - prev.y),
            ),
            None => cursor,
        };
        self.cursor = Some(smoothed);
        if self.os_cursor {
            self.move_os_cursor(smoothed, sink);
        }

        let hovered = self.row_under_cursor();
        if hovered != self.hovered {
            self.hovered = hovered;
            if let Some(row) = hovered {
                log::debug!("Hover: {}", self.row_label(row));
            }
        }
    }

    fn handle(&mut self, intent: FileIntent, sink: &mut dyn AutomationSink) {
        match intent {
            FileIntent::Select => self.select(sink),
            FileIntent::Back => match self.state {
                BrowserState::Browse { .. } => self.show_menu(),
                _ => log::debug!("Back ignored outside a file listing"),
            },
            FileIntent::Close => self.close(sink),
        }
    }
}
