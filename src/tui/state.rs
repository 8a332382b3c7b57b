use crate::model::{CatalogImage, CatalogSource, WorkloadInstance};
use crate::orchestrator::{AppEvent, Snapshot};

pub const TAB_RUNNING: usize = 0;
pub const TAB_LEDGER: usize = 1;
pub const TAB_CATALOG: usize = 2;
pub const TAB_SOURCES: usize = 3;
pub const TAB_TOKEN: usize = 4;
pub const TAB_HELP: usize = 5;
pub const TAB_TITLES: [&str; 6] = ["Running", "Ledger", "Catalog", "Sources", "Token", "Help"];

#[derive(Default)]
pub struct UiState {
    pub tab: usize,
    pub info: String,

    /// `None` until the first snapshot, or while the runtime is unreachable.
    pub running: Option<Vec<WorkloadInstance>>,
    pub ledger: Vec<WorkloadInstance>,
    pub images: Vec<CatalogImage>,
    pub sources: Vec<CatalogSource>,
    pub token: Option<String>,

    /// Selected row per list tab.
    pub selected: [usize; 4],
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn apply(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Snapshot(snap) => self.apply_snapshot(snap),
            AppEvent::Catalog { images, sources } => {
                self.images = images;
                self.sources = sources;
            }
            AppEvent::Message(m) => self.info = m,
        }
        self.clamp_selection();
    }

    fn apply_snapshot(&mut self, snap: Snapshot) {
        self.running = snap.running;
        self.ledger = snap.ledger;
        self.token = snap.token;
        if let Some(w) = snap.warning {
            self.info = w;
        } else if !snap.healed.is_empty() {
            self.info = format!("Marked {} stale workload(s) stopped", snap.healed.len());
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % TAB_TITLES.len();
    }

    pub fn prev_tab(&mut self) {
        self.tab = (self.tab + TAB_TITLES.len() - 1) % TAB_TITLES.len();
    }

    /// Rows in the list shown on `tab`; zero for non-list tabs.
    pub fn list_len(&self, tab: usize) -> usize {
        match tab {
            TAB_RUNNING => self.running.as_ref().map_or(0, Vec::len),
            TAB_LEDGER => self.ledger.len(),
            TAB_CATALOG => self.images.len(),
            TAB_SOURCES => self.sources.len(),
            _ => 0,
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(sel) = self.selected.get_mut(self.tab) {
            *sel = sel.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        let len = self.list_len(self.tab);
        if let Some(sel) = self.selected.get_mut(self.tab) {
            if *sel + 1 < len {
                *sel += 1;
            }
        }
    }

    fn clamp_selection(&mut self) {
        for tab in 0..self.selected.len() {
            let len = self.list_len(tab);
            self.selected[tab] = self.selected[tab].min(len.saturating_sub(1));
        }
    }

    pub fn selected_running(&self) -> Option<&WorkloadInstance> {
        self.running.as_ref()?.get(self.selected[TAB_RUNNING])
    }

    pub fn selected_image(&self) -> Option<&CatalogImage> {
        self.images.get(self.selected[TAB_CATALOG])
    }
}
