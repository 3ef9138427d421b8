// Centralized metric name constants for the redo reader crate.

#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    #[allow(dead_code)]
    pub description: &'static str,
}

pub const REDO_RECORDS_READ_TOTAL: Metric = Metric {
    name: "redo_reader_records_read_total",
    description: "Total number of records decoded from redo log files",
};

pub const REDO_TORN_TAILS_TOTAL: Metric = Metric {
    name: "redo_reader_torn_tails_total",
    description: "Total number of torn file tails detected and skipped",
};

pub const REDO_FILES_OPENED_TOTAL: Metric = Metric {
    name: "redo_reader_files_opened_total",
    description: "Total number of log files opened for replay (per kind)",
};

pub const REDO_OBJECTS_MIRRORED_TOTAL: Metric = Metric {
    name: "redo_reader_objects_mirrored_total",
    description: "Total number of remote objects mirrored to the local dir",
};

pub const REDO_EVENTS_DELIVERED_TOTAL: Metric = Metric {
    name: "redo_reader_events_delivered_total",
    description: "Total number of events delivered to the applier (per kind)",
};

#[allow(dead_code)]
pub const COUNTERS: &[Metric] = &[
    REDO_RECORDS_READ_TOTAL,
    REDO_TORN_TAILS_TOTAL,
    REDO_FILES_OPENED_TOTAL,
    REDO_OBJECTS_MIRRORED_TOTAL,
    REDO_EVENTS_DELIVERED_TOTAL,
];
