use checkmate_core::engine::{self, CompatibilityResult, SortColumn, Tier};
use checkmate_core::hardware::{HardwareProfile, LocalSystem};
use checkmate_core::models::{ModelDescriptor, RequestContext};

/// Context sizes the `c` key cycles through.
pub const CONTEXT_STEPS: [u32; 5] = [2048, 4096, 8192, 16384, 32768];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierFilter {
    All,
    Local,     // everything but Cloud Only
    Gpu,       // Native + Optimized
    Offload,   // Hybrid + CPU Bottleneck
    Experimental,
    Cloud,
}

impl TierFilter {
    pub fn label(&self) -> &str {
        match self {
            TierFilter::All => "All",
            TierFilter::Local => "Runs Locally",
            TierFilter::Gpu => "GPU",
            TierFilter::Offload => "Offload",
            TierFilter::Experimental => "Experimental",
            TierFilter::Cloud => "Cloud Only",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            TierFilter::All => TierFilter::Local,
            TierFilter::Local => TierFilter::Gpu,
            TierFilter::Gpu => TierFilter::Offload,
            TierFilter::Offload => TierFilter::Experimental,
            TierFilter::Experimental => TierFilter::Cloud,
            TierFilter::Cloud => TierFilter::All,
        }
    }

    pub fn admits(&self, tier: Tier) -> bool {
        match self {
            TierFilter::All => true,
            TierFilter::Local => tier.is_local(),
            TierFilter::Gpu => tier.at_least(Tier::OptimizedLocal),
            TierFilter::Offload => matches!(tier, Tier::HybridOffload | Tier::CpuBottleneck),
            TierFilter::Experimental => tier == Tier::Experimental,
            TierFilter::Cloud => tier == Tier::CloudOnly,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub search_query: String,
    /// Byte offset into `search_query`.
    pub cursor_position: usize,

    // Data
    pub local: LocalSystem,
    pub profile: HardwareProfile,
    models: Vec<ModelDescriptor>,
    pub context: RequestContext,
    pub all_results: Vec<CompatibilityResult>,
    pub filtered_results: Vec<usize>, // indices into all_results

    // Filters
    pub tier_filter: TierFilter,
    pub sort_column: SortColumn,

    // Table state
    pub selected_row: usize,

    // Detail view
    pub show_detail: bool,
}

impl App {
    pub fn new(
        local: LocalSystem,
        profile: HardwareProfile,
        models: Vec<ModelDescriptor>,
        context: RequestContext,
    ) -> Self {
        let mut app = App {
            should_quit: false,
            input_mode: InputMode::Normal,
            search_query: String::new(),
            cursor_position: 0,
            local,
            profile,
            models,
            context,
            all_results: Vec::new(),
            filtered_results: Vec::new(),
            tier_filter: TierFilter::All,
            sort_column: SortColumn::Tier,
            selected_row: 0,
            show_detail: false,
        };
        app.reclassify();
        app
    }

    /// Score every model again, e.g. after the context size changed.
    pub fn reclassify(&mut self) {
        let results = engine::classify_all(&self.profile, &self.models, self.context);
        self.all_results = engine::rank_results(results, self.sort_column);
        self.apply_filters();
    }

    fn re_sort(&mut self) {
        let selected_id = self.selected_result().map(|r| r.model_id.clone());
        let results = std::mem::take(&mut self.all_results);
        self.all_results = engine::rank_results(results, self.sort_column);
        self.apply_filters();

        // keep the cursor on the same model
        if let Some(id) = selected_id
            && let Some(pos) = self
                .filtered_results
                .iter()
                .position(|&i| self.all_results[i].model_id == id)
        {
            self.selected_row = pos;
        }
    }

    pub fn apply_filters(&mut self) {
        let query = self.search_query.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();

        self.filtered_results = self
            .all_results
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                let matches_search = terms.is_empty() || {
                    let searchable = format!(
                        "{} {} {}",
                        r.model_id.to_lowercase(),
                        r.tier.label().to_lowercase(),
                        r.recommended_strategy.to_lowercase()
                    );
                    terms.iter().all(|term| searchable.contains(term))
                };
                matches_search && self.tier_filter.admits(r.tier)
            })
            .map(|(i, _)| i)
            .collect();

        // Clamp selection
        if self.filtered_results.is_empty() {
            self.selected_row = 0;
        } else if self.selected_row >= self.filtered_results.len() {
            self.selected_row = self.filtered_results.len() - 1;
        }
    }

    pub fn selected_result(&self) -> Option<&CompatibilityResult> {
        self.filtered_results
            .get(self.selected_row)
            .map(|&idx| &self.all_results[idx])
    }

    pub fn move_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected_row + 1 < self.filtered_results.len() {
            self.selected_row += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(10);
    }

    pub fn page_down(&mut self) {
        if !self.filtered_results.is_empty() {
            self.selected_row = (self.selected_row + 10).min(self.filtered_results.len() - 1);
        }
    }

    pub fn home(&mut self) {
        self.selected_row = 0;
    }

    pub fn end(&mut self) {
        self.selected_row = self.filtered_results.len().saturating_sub(1);
    }

    pub fn cycle_tier_filter(&mut self) {
        self.tier_filter = self.tier_filter.next();
        self.apply_filters();
    }

    pub fn cycle_sort_column(&mut self) {
        self.sort_column = self.sort_column.next();
        self.re_sort();
    }

    /// Step to the next larger entry of [`CONTEXT_STEPS`], wrapping around.
    pub fn cycle_context(&mut self) {
        let current = self.context.tokens();
        let next = CONTEXT_STEPS
            .iter()
            .copied()
            .find(|&step| step > current)
            .unwrap_or(CONTEXT_STEPS[0]);
        if let Ok(ctx) = RequestContext::new(next) {
            self.context = ctx;
            self.reclassify();
        }
    }

    pub fn enter_search(&mut self) {
        self.input_mode = InputMode::Search;
    }

    pub fn exit_search(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Cursor column in characters, for placing the terminal cursor.
    pub fn cursor_column(&self) -> usize {
        self.search_query[..self.cursor_position].chars().count()
    }

    pub fn search_input(&mut self, c: char) {
        self.search_query.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
        self.apply_filters();
    }

    pub fn search_backspace(&mut self) {
        if let Some(c) = self.search_query[..self.cursor_position].chars().next_back() {
            self.cursor_position -= c.len_utf8();
            self.search_query.remove(self.cursor_position);
            self.apply_filters();
        }
    }

    pub fn search_delete(&mut self) {
        if self.cursor_position < self.search_query.len() {
            self.search_query.remove(self.cursor_position);
            self.apply_filters();
        }
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.cursor_position = 0;
        self.apply_filters();
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(ram: f64, vram: f64) -> App {
        let profile = HardwareProfile::new(ram, vram, 0.0).unwrap();
        let local = LocalSystem {
            profile: profile.clone(),
            available_ram_gb: ram / 2.0,
            cpu_cores: 8,
            gpus: Vec::new(),
        };
        let models = vec![
            ModelDescriptor::new("org/Tiny-1B", 1.0, 8192).unwrap(),
            ModelDescriptor::new("org/Mid-7B", 7.0, 32768).unwrap(),
            ModelDescriptor::new("org/Huge-70B", 70.0, 131072).unwrap(),
        ];
        App::new(local, profile, models, RequestContext::default())
    }

    #[test]
    fn test_new_classifies_every_model() {
        let app = app(16.0, 8.0);
        assert_eq!(app.all_results.len(), 3);
        assert_eq!(app.filtered_results.len(), 3);
        assert_eq!(app.all_results.last().unwrap().tier, Tier::CloudOnly);
    }

    #[test]
    fn test_tier_filter_cycles_back_to_all() {
        let mut app = app(16.0, 8.0);
        let start = app.tier_filter;
        for _ in 0..6 {
            app.cycle_tier_filter();
        }
        assert_eq!(app.tier_filter, start);
        assert_eq!(app.filtered_results.len(), 3);
    }

    #[test]
    fn test_local_filter_hides_cloud_only() {
        let mut app = app(16.0, 8.0);
        app.cycle_tier_filter();
        assert_eq!(app.tier_filter, TierFilter::Local);
        assert!(
            app.filtered_results
                .iter()
                .all(|&i| app.all_results[i].tier.is_local())
        );
        assert_eq!(app.filtered_results.len(), 2);
    }

    #[test]
    fn test_context_cycle_reclassifies() {
        let mut app = app(16.0, 8.0);
        assert_eq!(app.context.tokens(), 4096);
        app.cycle_context();
        assert_eq!(app.context.tokens(), 8192);
        assert!(
            app.all_results
                .iter()
                .all(|r| r.context_window_tokens == 8192)
        );

        app.cycle_context();
        app.cycle_context();
        app.cycle_context();
        assert_eq!(app.context.tokens(), 2048);
    }

    #[test]
    fn test_context_cycle_flags_overrun() {
        let mut app = app(16.0, 8.0);
        while app.context.tokens() != 16384 {
            app.cycle_context();
        }
        let tiny = app
            .all_results
            .iter()
            .find(|r| r.model_id == "org/Tiny-1B")
            .unwrap();
        assert!(tiny.is_over_context_limit);
    }

    #[test]
    fn test_search_terms_are_anded() {
        let mut app = app(16.0, 8.0);
        for c in "org 7b".chars() {
            app.search_input(c);
        }
        assert_eq!(app.filtered_results.len(), 1);
        assert_eq!(app.selected_result().unwrap().model_id, "org/Mid-7B");

        app.clear_search();
        assert_eq!(app.filtered_results.len(), 3);
    }

    #[test]
    fn test_search_backspace_handles_multibyte() {
        let mut app = app(16.0, 8.0);
        app.search_input('é');
        app.search_input('x');
        assert_eq!(app.cursor_column(), 2);
        app.search_backspace();
        app.search_backspace();
        assert!(app.search_query.is_empty());
        assert_eq!(app.cursor_position, 0);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut app = app(16.0, 8.0);
        app.move_up();
        assert_eq!(app.selected_row, 0);
        app.end();
        assert_eq!(app.selected_row, 2);
        app.move_down();
        assert_eq!(app.selected_row, 2);
        app.page_up();
        assert_eq!(app.selected_row, 0);
    }

    #[test]
    fn test_sort_keeps_selection() {
        let mut app = app(16.0, 8.0);
        app.end();
        let id = app.selected_result().unwrap().model_id.clone();
        app.cycle_sort_column();
        assert_eq!(app.sort_column, SortColumn::Params);
        assert_eq!(app.selected_result().unwrap().model_id, id);
    }
}
