dflags::dflags! {
    /// LSP server for rust.
    #[prog = "rust-analyzer"]
    struct RustAnalyzer {
        /// Number of concurrent jobs.
        #[positional]
        jobs: Option<u32>,
        /// Path to log file.
        log_file: Option<String>,
        #[alias = "-v"]
        verbose: bool,
        food: Food,
        action: Run | AnalysisStats,
    }

    /// Run the thing.
    struct Run {}

    /// Analysis statistics.
    struct AnalysisStats {
        /// Directory to analyse.
        #[positional]
        path: String,
        parallel: bool,
    }

    enum Food {
        Gnocchi,
        Kimchi,
    }
}
