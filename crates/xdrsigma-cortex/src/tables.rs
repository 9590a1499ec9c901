//! Static mapping tables between generic Sigma taxonomy and Cortex XDR
//! datasets, presets and field names.
//!
//! Field names follow the `xdr_data` schema: `action_*` fields describe the
//! event itself, `actor_*` the initiating process and `causality_actor_*` the
//! root of the causality chain.

/// Whether an activity type is queried through a dataset or a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Dataset,
    Preset,
}

impl IndexKind {
    /// Keyword used in the XQL query head (`dataset = ...` / `preset = ...`).
    pub fn keyword(&self) -> &'static str {
        match self {
            IndexKind::Dataset => "dataset",
            IndexKind::Preset => "preset",
        }
    }
}

/// The dataset or preset an activity type is served from.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub kind: IndexKind,
    pub name: &'static str,
}

impl IndexSpec {
    /// State value stored by the pipeline, e.g. `preset::xdr_process`.
    pub fn state_value(&self) -> String {
        format!("{}::{}", self.kind.keyword(), self.name)
    }
}

/// One Cortex XDR activity type: its index, the Sigma logsource categories it
/// covers and the field translations for those categories.
///
/// A source field mapped to more than one target expands into a disjunction
/// over all targets, since XDR often splits one generic concept (e.g. a
/// connection's port) into local and remote variants.
#[derive(Debug, Clone, Copy)]
pub struct ActivityType {
    pub name: &'static str,
    pub index: IndexSpec,
    pub categories: &'static [&'static str],
    pub fields: &'static [(&'static str, &'static [&'static str])],
}

const PROCESS_FIELDS: &[(&str, &[&str])] = &[
    ("ProcessId", &["action_process_os_pid"]),
    ("Image", &["action_process_image_path"]),
    ("Product", &["action_process_signature_product"]),
    ("Company", &["action_process_signature_vendor"]),
    ("CommandLine", &["action_process_image_command_line"]),
    ("CurrentDirectory", &["action_process_cwd"]),
    ("User", &["action_process_username"]),
    ("IntegrityLevel", &["action_process_integrity_level"]),
    ("md5", &["action_process_image_md5"]),
    ("sha256", &["action_process_image_sha256"]),
    ("ParentProcessId", &["actor_process_os_pid"]),
    ("ParentImage", &["actor_process_image_path"]),
    ("ParentCommandLine", &["actor_process_image_command_line"]),
];

const FILE_FIELDS: &[(&str, &[&str])] = &[
    ("Image", &["actor_process_image_path"]),
    ("CommandLine", &["actor_process_image_command_line"]),
    ("ParentImage", &["causality_actor_process_image_path"]),
    ("ParentCommandLine", &["causality_actor_process_command_line"]),
    ("TargetFilename", &["action_file_name"]),
    ("SourceFilename", &["action_file_previous_file_name"]),
];

const IMAGE_LOAD_FIELDS: &[(&str, &[&str])] = &[
    ("Image", &["actor_process_image_path"]),
    ("CommandLine", &["actor_process_image_command_line"]),
    ("ParentImage", &["causality_actor_process_image_path"]),
    ("ParentCommandLine", &["causality_actor_process_command_line"]),
    ("ImageLoaded", &["action_module_path"]),
    ("md5", &["action_module_md5"]),
    ("sha256", &["action_module_sha256"]),
];

const REGISTRY_FIELDS: &[(&str, &[&str])] = &[
    ("Image", &["actor_process_image_path"]),
    ("CommandLine", &["actor_process_image_command_line"]),
    ("ParentImage", &["causality_actor_process_image_path"]),
    ("ParentCommandLine", &["causality_actor_process_command_line"]),
    ("TargetObject", &["action_registry_key_name"]),
    ("Details", &["action_registry_value_name", "action_registry_data"]),
];

const NETWORK_FIELDS: &[(&str, &[&str])] = &[
    ("Image", &["actor_process_image_path"]),
    ("CommandLine", &["actor_process_image_command_line"]),
    ("ParentImage", &["causality_actor_process_image_path"]),
    ("ParentCommandLine", &["causality_actor_process_command_line"]),
    ("DestinationPort", &["action_local_port", "action_remote_port"]),
    ("SourcePort", &["action_local_port", "action_remote_port"]),
    ("DestinationIp", &["action_local_ip", "action_remote_ip"]),
    ("SourceIp", &["action_local_ip", "action_remote_ip"]),
    ("User", &["action_username"]),
    ("Protocol", &["action_network_protocol"]),
    ("dst_ip", &["action_local_ip", "action_remote_ip"]),
    ("src_ip", &["action_local_ip", "action_remote_ip"]),
    ("dst_port", &["action_local_port", "action_remote_port"]),
    ("src_port", &["action_local_port", "action_remote_port"]),
];

/// All supported activity types in declaration order.
pub const ACTIVITY_TYPES: &[ActivityType] = &[
    ActivityType {
        name: "process",
        index: IndexSpec {
            kind: IndexKind::Preset,
            name: "xdr_process",
        },
        categories: &["process_creation"],
        fields: PROCESS_FIELDS,
    },
    ActivityType {
        name: "file",
        index: IndexSpec {
            kind: IndexKind::Preset,
            name: "xdr_file",
        },
        categories: &["file_change", "file_rename", "file_delete", "file_event"],
        fields: FILE_FIELDS,
    },
    ActivityType {
        name: "image_load",
        index: IndexSpec {
            kind: IndexKind::Dataset,
            name: "xdr_data",
        },
        categories: &["image_load"],
        fields: IMAGE_LOAD_FIELDS,
    },
    ActivityType {
        name: "registry",
        index: IndexSpec {
            kind: IndexKind::Preset,
            name: "xdr_registry",
        },
        categories: &["registry_add", "registry_delete", "registry_event", "registry_set"],
        fields: REGISTRY_FIELDS,
    },
    ActivityType {
        name: "network",
        index: IndexSpec {
            kind: IndexKind::Preset,
            name: "network_story",
        },
        categories: &["network_connection", "firewall"],
        fields: NETWORK_FIELDS,
    },
];

/// Event-type tag conditions injected per logsource category.
pub const EVENT_TYPE_TAGS: &[(&str, &[(&str, &str)])] = &[
    (
        "process_creation",
        &[
            ("event_type", "ENUM.PROCESS"),
            ("event_sub_type", "ENUM.PROCESS_START"),
        ],
    ),
    ("file_change", &[("event_type", "ENUM.FILE")]),
    ("file_rename", &[("event_type", "ENUM.FILE")]),
    ("file_delete", &[("event_type", "ENUM.FILE")]),
    ("file_event", &[("event_type", "ENUM.FILE")]),
    ("image_load", &[("event_type", "ENUM.LOAD_IMAGE")]),
    ("registry_add", &[("event_type", "ENUM.REGISTRY")]),
    ("registry_delete", &[("event_type", "ENUM.REGISTRY")]),
    ("registry_event", &[("event_type", "ENUM.REGISTRY")]),
    ("registry_set", &[("event_type", "ENUM.REGISTRY")]),
    ("network_connection", &[("event_type", "ENUM.NETWORK")]),
    ("firewall", &[("event_type", "ENUM.NETWORK")]),
];

/// Field carrying the agent operating system tag.
pub const OS_TYPE_FIELD: &str = "agent_os_type";

/// Per-product OS tag conditions.
pub const OS_TYPE_TAGS: &[(&str, &str)] = &[
    ("windows", "ENUM.AGENT_OS_WINDOWS"),
    ("linux", "ENUM.AGENT_OS_LINUX"),
    ("macos", "ENUM.AGENT_OS_MAC"),
];

/// Field holding the numeric process integrity level.
pub const INTEGRITY_LEVEL_FIELD: &str = "action_process_integrity_level";

/// Symbolic integrity levels and their numeric half-open ranges
/// `[lower, upper)`. `None` bounds are unbounded on that side.
pub const INTEGRITY_LEVEL_RANGES: &[(&str, Option<i64>, Option<i64>)] = &[
    ("UNTRUSTED", None, Some(4096)),
    ("LOW", Some(4096), Some(8192)),
    ("MEDIUM", Some(8192), Some(12288)),
    ("HIGH", Some(12288), Some(16384)),
    ("SYSTEM", Some(16384), None),
];

/// The union of all source field names across activity types, sorted and
/// deduplicated. This is the exhaustive set the pipeline accepts.
pub fn supported_fields() -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = ACTIVITY_TYPES
        .iter()
        .flat_map(|at| at.fields.iter().map(|(source, _)| *source))
        .collect();
    fields.sort_unstable();
    fields.dedup();
    fields
}

/// All logsource categories covered by an activity type.
pub fn supported_categories() -> Vec<&'static str> {
    EVENT_TYPE_TAGS.iter().map(|(category, _)| *category).collect()
}
