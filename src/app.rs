//! Main application state and UI

use eframe::egui;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use crate::analysis::{
    align_candidate, parse_primers, read_primers, reverse_complement, run_screening, Primer,
    ProgressUpdate, ScreenError, ScreenParams, ScreeningResults, TailSweepParams, ThreadCount,
    MAX_JMER_LEN, MAX_TAIL_LEN,
};

/// Application state
pub struct DimerscreenApp {
    // Input tab state
    primer_input: String,
    primers: Option<Vec<Primer>>,
    primer_error: Option<String>,

    // Analysis parameters
    params: ScreenParams,
    thread_selection: ThreadSelection,
    manual_thread_count: usize,
    run_sweep: bool,
    sweep_params: TailSweepParams,

    // Analysis state
    is_analyzing: bool,
    analysis_progress: Option<ProgressUpdate>,
    progress_rx: Option<Receiver<ProgressUpdate>>,
    results_rx: Option<Receiver<Result<ScreeningResults, ScreenError>>>,
    analysis_error: Option<String>,

    // Results state
    results: Option<ScreeningResults>,
    name_filter: String,
    selected_candidate: Option<usize>,
    show_detail_window: bool,
    detail_show_table: bool,

    // View state
    current_tab: Tab,

    // Save/Load
    save_error: Option<String>,
    load_error: Option<String>,

    // Deferred actions
    pending_save: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Input,
    Analysis,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadSelection {
    Auto,
    Manual,
}

impl Default for DimerscreenApp {
    fn default() -> Self {
        let available_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            primer_input: String::new(),
            primers: None,
            primer_error: None,
            params: ScreenParams::default(),
            thread_selection: ThreadSelection::Auto,
            manual_thread_count: available_threads,
            run_sweep: false,
            sweep_params: TailSweepParams::default(),
            is_analyzing: false,
            analysis_progress: None,
            progress_rx: None,
            results_rx: None,
            analysis_error: None,
            results: None,
            name_filter: String::new(),
            selected_candidate: None,
            show_detail_window: false,
            detail_show_table: false,
            current_tab: Tab::Input,
            save_error: None,
            load_error: None,
            pending_save: false,
        }
    }
}

impl DimerscreenApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::default()
    }

    fn parse_primer_input(&mut self) {
        self.primer_error = None;
        self.primers = None;

        if self.primer_input.trim().is_empty() {
            return;
        }

        match parse_primers(&self.primer_input) {
            Ok(primers) => {
                self.primers = Some(primers);
            }
            Err(e) => {
                self.primer_error = Some(e.to_string());
            }
        }
    }

    fn start_analysis(&mut self) {
        let Some(primers) = &self.primers else {
            return;
        };

        self.params.thread_count = match self.thread_selection {
            ThreadSelection::Auto => ThreadCount::Auto,
            ThreadSelection::Manual => ThreadCount::Fixed(self.manual_thread_count),
        };
        self.params.tail_sweep = self.run_sweep.then(|| self.sweep_params.clone());

        let primers_clone = primers.clone();
        let params_clone = self.params.clone();

        let (progress_tx, progress_rx) = channel();
        let (results_tx, results_rx) = channel();

        self.progress_rx = Some(progress_rx);
        self.results_rx = Some(results_rx);
        self.is_analyzing = true;
        self.analysis_progress = None;
        self.analysis_error = None;

        thread::spawn(move || {
            let results = run_screening(&primers_clone, &params_clone, Some(progress_tx));
            let _ = results_tx.send(results);
        });
    }

    fn check_analysis_progress(&mut self) {
        if let Some(rx) = &self.progress_rx {
            while let Ok(progress) = rx.try_recv() {
                self.analysis_progress = Some(progress);
            }
        }

        if let Some(rx) = &self.results_rx {
            if let Ok(outcome) = rx.try_recv() {
                match outcome {
                    Ok(results) => {
                        self.results = Some(results);
                        self.selected_candidate = None;
                        self.show_detail_window = false;
                        self.current_tab = Tab::Results;
                    }
                    Err(e) => {
                        log::error!("Screening failed: {}", e);
                        self.analysis_error = Some(e.to_string());
                    }
                }
                self.is_analyzing = false;
                self.progress_rx = None;
                self.results_rx = None;
            }
        }
    }

    fn save_results(&mut self) {
        let Some(results) = &self.results else {
            self.save_error = Some("No results to save".to_string());
            return;
        };

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("dimer_screen_results.json")
            .save_file()
        {
            match serde_json::to_string_pretty(results) {
                Ok(json) => {
                    if let Err(e) = std::fs::write(&path, json) {
                        self.save_error = Some(format!("Failed to write file: {}", e));
                    } else {
                        log::info!("Saved results to {}", path.display());
                        self.save_error = None;
                    }
                }
                Err(e) => {
                    self.save_error = Some(format!("Failed to serialize: {}", e));
                }
            }
        }
    }

    fn load_results(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            match std::fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<ScreeningResults>(&json) {
                    Ok(results) => {
                        self.params = results.params.clone();
                        self.results = Some(results);
                        self.selected_candidate = None;
                        self.load_error = None;
                        self.current_tab = Tab::Results;
                    }
                    Err(e) => {
                        self.load_error = Some(format!("Failed to parse: {}", e));
                    }
                },
                Err(e) => {
                    self.load_error = Some(format!("Failed to read file: {}", e));
                }
            }
        }
    }

    fn load_primer_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Primers", &["csv", "txt", "fasta", "fa"])
            .pick_file()
        {
            match read_primers(&path) {
                Ok(primers) => {
                    self.primer_input = primers
                        .iter()
                        .map(|p| format!("{},{}\n", p.name, p.sequence))
                        .collect();
                    self.primer_error = None;
                    self.primers = Some(primers);
                }
                Err(e) => {
                    self.primer_error = Some(format!("Failed to load {}: {}", path.display(), e));
                }
            }
        }
    }
}

impl eframe::App for DimerscreenApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.is_analyzing {
            self.check_analysis_progress();
            ctx.request_repaint();
        }

        if self.pending_save {
            self.pending_save = false;
            self.save_results();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Load Primers...").clicked() {
                        self.load_primer_file();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Load Results...").clicked() {
                        self.load_results();
                        ui.close_menu();
                    }
                    if ui.button("Save Results...").clicked() {
                        self.save_results();
                        ui.close_menu();
                    }
                });
            });
        });

        // Tab bar
        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.current_tab, Tab::Input, "Primers");
                ui.selectable_value(&mut self.current_tab, Tab::Analysis, "Analysis Setup");
                ui.selectable_value(&mut self.current_tab, Tab::Results, "Results");
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.is_analyzing {
                    ui.spinner();
                    if let Some(ref progress) = self.analysis_progress {
                        ui.label(format!(
                            "[{}/{}] {}",
                            progress.step, progress.total_steps, progress.message
                        ));
                    } else {
                        ui.label("Starting analysis...");
                    }
                } else if let Some(ref results) = self.results {
                    ui.label(format!(
                        "Results: {} primers, {} dimer candidates",
                        results.primers.len(),
                        results.candidates.len()
                    ));
                } else if let Some(ref primers) = self.primers {
                    ui.label(format!("Primers: {} loaded", primers.len()));
                } else {
                    ui.label("Load a primer list to begin");
                }
            });
        });

        // Main content
        egui::CentralPanel::default().show(ctx, |ui| match self.current_tab {
            Tab::Input => self.show_input_tab(ui),
            Tab::Analysis => self.show_analysis_tab(ui),
            Tab::Results => self.show_results_tab(ui),
        });

        // Detail window
        if self.show_detail_window {
            self.show_alignment_window(ctx);
        }
    }
}

impl DimerscreenApp {
    fn show_input_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Primers");
        ui.separator();

        let panel_height = (ui.available_height() - 120.0).max(160.0);

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.heading("Primer List");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Clear").clicked() {
                        self.primer_input.clear();
                        self.primers = None;
                        self.primer_error = None;
                    }
                    if ui.button("Load File").clicked() {
                        self.load_primer_file();
                    }
                    if ui.button("Load Example").clicked() {
                        self.primer_input = EXAMPLE_PRIMERS.to_string();
                        self.parse_primer_input();
                    }
                });
            });

            ui.label("One primer per line as name,sequence[,...] or FASTA (A, C, G, T only):");

            egui::ScrollArea::vertical()
                .id_salt("primer_scroll")
                .max_height(panel_height)
                .show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut self.primer_input)
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .desired_rows(12),
                    );
                    if response.changed() {
                        self.parse_primer_input();
                    }
                });

            if let Some(ref error) = self.primer_error {
                ui.colored_label(egui::Color32::RED, format!("Error: {}", error));
            }
            if let Some(ref primers) = self.primers {
                let min_len = primers.iter().map(Primer::len).min().unwrap_or(0);
                let max_len = primers.iter().map(Primer::len).max().unwrap_or(0);
                ui.colored_label(
                    egui::Color32::from_rgb(100, 200, 100),
                    format!("Primers: {} ({}-{} bp)", primers.len(), min_len, max_len),
                );
            }
        });
    }

    fn show_analysis_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Analysis Setup");
        ui.separator();

        let Some(shortest) = self
            .primers
            .as_ref()
            .map(|p| p.iter().map(Primer::len).min().unwrap_or(0))
        else {
            ui.colored_label(
                egui::Color32::YELLOW,
                "Please load primers in the Primers tab.",
            );
            return;
        };

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.group(|ui| {
                ui.heading("3' Tail Matching");
                ui.horizontal(|ui| {
                    ui.label("Tail length:");
                    ui.add(egui::DragValue::new(&mut self.params.tail_len).range(1..=MAX_TAIL_LEN));
                    ui.add_space(20.0);
                    ui.label("Maximum mismatches:");
                    ui.add(egui::DragValue::new(&mut self.params.max_mismatches).range(0..=3));
                });
                ui.label("The 3'-most base must always pair; mismatches are allowed elsewhere in the tail.");
                if self.params.tail_len > shortest {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("Tail length exceeds the shortest primer ({} bp)", shortest),
                    );
                }
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.heading("j-mer Signature");
                ui.horizontal(|ui| {
                    ui.label("j-mer length:");
                    ui.add(egui::DragValue::new(&mut self.params.jmer_len).range(1..=MAX_JMER_LEN));
                    ui.add_space(20.0);
                    ui.label("Minimum matching j-mers:");
                    ui.add(
                        egui::DragValue::new(&mut self.params.minimum_matching_jmers).range(0..=50),
                    );
                });
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.heading("Complementary Run");
                ui.horizontal(|ui| {
                    ui.label("Minimum run length:");
                    ui.add(egui::DragValue::new(&mut self.params.minimum_lcs).range(0..=100));
                });
                ui.label("0 disables the longest-common-substring filter.");
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.heading("Sampling");
                ui.horizontal(|ui| {
                    ui.label("Sample size (primers):");
                    ui.add(egui::DragValue::new(&mut self.params.sample_size).range(1..=100_000));
                });
                ui.label("Filter pass rates are reported over the first N x N pairs.");
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.heading("Tail Configuration Sweep");
                ui.checkbox(&mut self.run_sweep, "Tabulate hit rates across tail configurations");
                ui.add_enabled_ui(self.run_sweep, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Tail lengths:");
                        ui.add(
                            egui::DragValue::new(&mut self.sweep_params.min_tail_len)
                                .range(1..=MAX_TAIL_LEN),
                        );
                        ui.label("to");
                        ui.add(
                            egui::DragValue::new(&mut self.sweep_params.max_tail_len)
                                .range(1..=MAX_TAIL_LEN),
                        );
                        ui.add_space(20.0);
                        ui.label("Mismatches up to:");
                        ui.add(
                            egui::DragValue::new(&mut self.sweep_params.max_mismatches).range(0..=3),
                        );
                    });
                });
                if self.sweep_params.min_tail_len > self.sweep_params.max_tail_len {
                    self.sweep_params.max_tail_len = self.sweep_params.min_tail_len;
                }
            });

            ui.add_space(10.0);

            ui.group(|ui| {
                ui.heading("Parallelization");

                let available_threads = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);

                ui.horizontal(|ui| {
                    ui.radio_value(
                        &mut self.thread_selection,
                        ThreadSelection::Auto,
                        format!("Auto ({} threads)", available_threads),
                    );
                });

                ui.horizontal(|ui| {
                    ui.radio_value(
                        &mut self.thread_selection,
                        ThreadSelection::Manual,
                        "Manual:",
                    );
                    let enabled = self.thread_selection == ThreadSelection::Manual;
                    ui.add_enabled(
                        enabled,
                        egui::DragValue::new(&mut self.manual_thread_count)
                            .range(1..=available_threads.max(32)),
                    );
                    ui.label("threads");
                });
            });

            ui.add_space(20.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.is_analyzing, egui::Button::new("Run Screening"))
                    .clicked()
                {
                    self.start_analysis();
                }

                if self.is_analyzing {
                    ui.spinner();
                    if let Some(ref progress) = self.analysis_progress {
                        ui.label(&progress.message);
                    }
                }
            });

            if let Some(ref error) = self.analysis_error {
                ui.colored_label(egui::Color32::RED, format!("Error: {}", error));
            }
        });
    }

    fn show_results_tab(&mut self, ui: &mut egui::Ui) {
        let Some(results) = &self.results else {
            ui.heading("Results");
            ui.separator();
            ui.label("No results yet. Run a screening from the Analysis Setup tab.");
            return;
        };

        ui.horizontal(|ui| {
            ui.heading("Results");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Save Results").clicked() {
                    self.pending_save = true;
                }
            });
        });
        ui.separator();

        let params = &results.params;
        ui.label(format!(
            "tail length {} | max mismatches {} | j = {} | min matching j-mers {} | min run {}",
            params.tail_len,
            params.max_mismatches,
            params.jmer_len,
            params.minimum_matching_jmers,
            params.minimum_lcs
        ));

        ui.group(|ui| {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("Primers: {}", results.primers.len()));
                ui.separator();
                ui.label(format!("Tail hit fraction: {:.4}", results.tail_hit_fraction));
                ui.separator();
                ui.label(format!("Mean shared j-mers: {:.3}", results.mean_shared_jmers));
                ui.separator();
                ui.label(format!(
                    "Candidates: {} ({:.4} of pairs)",
                    results.candidates.len(),
                    results.candidate_fraction()
                ));
            });
            ui.label(format!(
                "Sample of {} primers: {:.4} of pairs pass the tail test, {:.4} pass the j-mer test",
                results.sample.sample_size, results.sample.tail_fraction, results.sample.jmer_fraction
            ));
        });

        if !results.jmer_histogram.is_empty() {
            ui.add_space(5.0);
            ui.collapsing("Shared j-mer distribution", |ui| {
                egui::Grid::new("jmer_histogram_grid")
                    .striped(true)
                    .min_col_width(70.0)
                    .show(ui, |ui| {
                        ui.strong("Shared j-mers");
                        ui.strong("Ordered pairs");
                        ui.end_row();

                        for (count, pairs) in &results.jmer_histogram {
                            ui.label(format!("{}", count));
                            ui.label(format!("{}", pairs));
                            ui.end_row();
                        }
                    });
            });
        }

        if !results.sweep.is_empty() {
            ui.add_space(5.0);
            ui.collapsing("Tail configuration sweep", |ui| {
                egui::Grid::new("sweep_grid")
                    .striped(true)
                    .min_col_width(70.0)
                    .show(ui, |ui| {
                        ui.strong("Max mismatches");
                        ui.strong("Tail length");
                        ui.strong("Index entries");
                        ui.strong("Actual hit");
                        ui.strong("Expected hit");
                        ui.end_row();

                        for row in &results.sweep {
                            ui.label(format!("{}", row.max_mismatches));
                            ui.label(format!("{}", row.tail_len));
                            ui.label(format!("{}", row.index_entries));
                            ui.label(format!("{:.6}", row.mean_hit_fraction));
                            match row.expected_hit_fraction {
                                Some(p) => ui.label(format!("{:.6}", p)),
                                None => ui.label(""),
                            };
                            ui.end_row();
                        }
                    });
            });
        }

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            ui.label("Filter by name:");
            ui.text_edit_singleline(&mut self.name_filter);
        });

        let filter = self.name_filter.trim().to_string();
        let mut clicked = None;

        egui::ScrollArea::vertical()
            .id_salt("candidates_scroll")
            .show(ui, |ui| {
                egui::Grid::new("candidates_grid")
                    .striped(true)
                    .min_col_width(60.0)
                    .show(ui, |ui| {
                        ui.strong("#");
                        ui.strong("Primer");
                        ui.strong("Partner");
                        ui.strong("Shared j-mers");
                        ui.strong("Run");
                        ui.strong("");
                        ui.end_row();

                        for (i, candidate) in results.candidates.iter().enumerate() {
                            if !filter.is_empty()
                                && !candidate.name_a.contains(&filter)
                                && !candidate.name_b.contains(&filter)
                            {
                                continue;
                            }
                            ui.label(format!("{}", i + 1));
                            ui.monospace(&candidate.name_a);
                            ui.monospace(&candidate.name_b);
                            ui.label(format!("{}", candidate.jmer_matches));
                            ui.label(
                                candidate
                                    .lcs
                                    .map(|l| l.to_string())
                                    .unwrap_or_else(|| "-".to_string()),
                            );
                            if ui.small_button("Align").clicked() {
                                clicked = Some(i);
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(i) = clicked {
            self.selected_candidate = Some(i);
            self.show_detail_window = true;
        }

        if let Some(ref error) = self.save_error {
            ui.colored_label(egui::Color32::RED, error);
        }
        if let Some(ref error) = self.load_error {
            ui.colored_label(egui::Color32::RED, error);
        }
    }

    fn show_alignment_window(&mut self, ctx: &egui::Context) {
        let Some(ref results) = self.results else {
            self.show_detail_window = false;
            return;
        };

        let Some(candidate) = self
            .selected_candidate
            .and_then(|i| results.candidates.get(i))
        else {
            self.show_detail_window = false;
            return;
        };

        let alignment = match align_candidate(&results.primers, candidate) {
            Ok(alignment) => alignment,
            Err(e) => {
                log::warn!("Could not align {} / {}: {}", candidate.name_a, candidate.name_b, e);
                self.show_detail_window = false;
                return;
            }
        };

        let primer_a = &results.primers[candidate.primer_a];
        let primer_b = &results.primers[candidate.primer_b];
        let a_rc = reverse_complement(&primer_a.sequence).unwrap_or_default();

        egui::Window::new(format!("{} x {}", candidate.name_a, candidate.name_b))
            .open(&mut self.show_detail_window)
            .default_width(600.0)
            .default_height(400.0)
            .show(ctx, |ui| {
                egui::Grid::new("pair_grid").num_columns(2).show(ui, |ui| {
                    ui.label(format!("{}:", primer_a.name));
                    ui.monospace(&primer_a.sequence);
                    ui.end_row();
                    ui.label("reverse complement:");
                    ui.monospace(&a_rc);
                    ui.end_row();
                    ui.label(format!("{}:", primer_b.name));
                    ui.monospace(&primer_b.sequence);
                    ui.end_row();
                });

                ui.separator();
                ui.label(format!("Edit distance: {}", alignment.cost));
                ui.label(format!("Shared j-mers: {}", candidate.jmer_matches));

                ui.add(
                    egui::Label::new(
                        egui::RichText::new(alignment.trace.to_string())
                            .monospace()
                            .size(13.0)
                            .color(egui::Color32::from_rgb(100, 180, 255)),
                    )
                    .wrap_mode(egui::TextWrapMode::Extend),
                );

                ui.separator();
                ui.checkbox(&mut self.detail_show_table, "Show DP table");
                if self.detail_show_table {
                    egui::ScrollArea::both().max_height(250.0).show(ui, |ui| {
                        ui.add(
                            egui::Label::new(
                                egui::RichText::new(alignment.table.render())
                                    .monospace()
                                    .size(11.0),
                            )
                            .wrap_mode(egui::TextWrapMode::Extend),
                        );
                    });
                }
            });
    }
}

const EXAMPLE_PRIMERS: &str = "P1,ATCGATCGA
P2,TCGATCGAT
fwd_gapdh,GAAGGTGAAGGTCGGAGTCA
rev_gapdh,TTGAGGTCAATGAAGGGGTC
fwd_actb,CATGTACGTTGCTATCCAGGC
rev_actb,CTCCTTAATGTCACGCACGAT
hairpin,GGATCCAAAAGGATCC
";
