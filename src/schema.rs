//! The configuration schema for graph embedding training.
//!
//! Two views of the same schema live side by side here: the typed records
//! (`GraphConfig`, `EntityConfig`, `RelationConfig`) that the rest of the
//! system consumes, and the declarative `RecordType` descriptions that
//! drive dotted-path navigation, override typing, validation, and help
//! output. Keeping them in one file is what keeps them from drifting.

use crate::record::{Constraint, FieldDescriptor, FieldKind, RecordType, ScalarKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Iteration order over partition buckets during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOrder {
    /// Random shuffle.
    Random,
    /// Prefer buckets sharing a partition with the one trained before.
    Affinity,
    /// Buckets whose smaller partition index is larger come first.
    InsideOut,
    /// The per-layer reverse of inside-out.
    OutsideIn,
}

impl BucketOrder {
    /// The closed variant set, as spelled in configuration files.
    pub const VARIANTS: &'static [&'static str] =
        &["random", "affinity", "inside_out", "outside_in"];
}

/// Per-entity-type configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Number of partitions for this entity type; 1 if unpartitioned.
    pub num_partitions: usize,

    /// Whether entities of this type are represented as sets of features.
    pub featurized: bool,

    /// Per-type override of the global embedding dimension.
    pub dimension: Option<usize>,
}

/// Per-relation-type configuration. A relation's identity elsewhere in the
/// system is its position in the `relations` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationConfig {
    /// Human-readable identifier, used in logging only.
    pub name: String,

    /// Entity type on the left-hand side; a key of the `entities` mapping.
    pub lhs: String,

    /// Entity type on the right-hand side; a key of the `entities` mapping.
    pub rhs: String,

    /// Multiplier on the loss induced by edges of this relation type.
    pub weight: f64,

    /// Transformation applied to one side's embedding before comparison.
    pub operator: String,

    /// Use all same-partition entities of the same type as negatives.
    pub all_negs: bool,
}

/// The validated, immutable top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    // Model.
    /// The entity types, keyed by the ID relations reference them with.
    pub entities: HashMap<String, EntityConfig>,
    /// The relation types; edge lists reference them by index.
    pub relations: Vec<RelationConfig>,
    /// Dimension of the embedding space.
    pub dimension: usize,
    /// Standard deviation used when sampling initial embeddings.
    pub init_scale: f64,
    /// If set, embeddings are rescaled when their norm exceeds this.
    pub max_norm: Option<f64>,
    /// Learn one extra per-entity-type vector added to each embedding.
    pub global_emb: bool,
    /// How two sides of an edge are compared to produce a score.
    pub comparator: String,
    /// Withhold the first embedding dimension and use it as a bias term.
    pub bias: bool,
    /// How positive scores are evaluated against their negatives.
    pub loss_fn: String,
    /// Minimum separation between positive and negative scores under
    /// ranking loss.
    pub margin: f64,

    // Data.
    /// Directory holding the entity count files.
    pub entity_path: String,
    /// Directories holding partitioned edge lists; usually one.
    pub edge_paths: Vec<String>,
    /// Directory checkpoints are written to; training resumes from any
    /// checkpoints found there.
    pub checkpoint_path: String,
    /// Directory with initial embedding values, if any.
    pub init_path: Option<String>,
    /// Archive a checkpoint snapshot every so many epochs.
    pub checkpoint_preservation_interval: Option<usize>,

    // Training.
    /// Passes of the training loop over all edges.
    pub num_epochs: usize,
    /// Parts each bucket is split into; derived from
    /// `max_edges_per_chunk` when unset.
    pub num_edge_chunks: Option<usize>,
    /// Ceiling used when the number of edge chunks is derived.
    pub max_edges_per_chunk: usize,
    /// Iteration order over buckets.
    pub bucket_order: BucketOrder,
    /// Worker processes for lock-free training; CPU count when unset.
    pub workers: Option<usize>,
    /// Edges per batch.
    pub batch_size: usize,
    /// Negatives sampled from the batch, per positive edge.
    pub num_batch_negs: usize,
    /// Negatives sampled uniformly from the active partition, per positive
    /// edge.
    pub num_uniform_negs: usize,
    /// Disable negative sampling on the left-hand side.
    pub disable_lhs_negs: bool,
    /// Disable negative sampling on the right-hand side.
    pub disable_rhs_negs: bool,
    /// Optimizer learning rate.
    pub lr: f64,
    /// Learning rate for relation parameters; falls back to `lr`.
    pub relation_lr: Option<f64>,
    /// Fraction of edges withheld for evaluation during training.
    pub eval_fraction: f64,
    /// Batch-negative count used during the evaluation steps.
    pub eval_num_batch_negs: usize,
    /// Uniform-negative count used during the evaluation steps.
    pub eval_num_uniform_negs: usize,

    // Expert.
    /// Deprecated; has no effect.
    pub background_io: bool,
    /// Logging verbosity, currently 0 or 1.
    pub verbose: usize,
    /// Seconds to delay the start of every worker but the first on the
    /// first epoch.
    pub hogwild_delay: f64,
    /// Dynamic relation mode: a single relation type whose parameters
    /// apply to a runtime-provided number of relations.
    pub dynamic_relations: bool,

    // Distributed.
    /// Machines participating in distributed training.
    pub num_machines: usize,
    /// -1 to use trainers as partition servers, 0 to swap partitions
    /// through disk, a positive count for externally started servers.
    pub num_partition_servers: i64,
    /// URI synchronizing the workers of a distributed run.
    pub distributed_init_method: Option<String>,
    /// Only train a bucket once one of its partitions has been seen this
    /// round (or contains partition 0, for bootstrapping).
    pub distributed_tree_init_order: bool,
    /// GPUs used for training.
    pub num_gpus: usize,
    /// Communication groups used by the partition servers.
    pub num_groups_for_partition_server: usize,
    /// Train in half precision (GPU only).
    pub half_precision: bool,
}

fn boolean() -> FieldKind {
    FieldKind::Scalar(ScalarKind::Bool)
}

fn int() -> FieldKind {
    FieldKind::Scalar(ScalarKind::Int)
}

fn float() -> FieldKind {
    FieldKind::Scalar(ScalarKind::Float)
}

fn string() -> FieldKind {
    FieldKind::Scalar(ScalarKind::Str)
}

fn optional(inner: FieldKind) -> FieldKind {
    FieldKind::Optional(Box::new(inner))
}

impl EntityConfig {
    /// Declarative description of the `entity` record.
    pub fn record() -> RecordType {
        RecordType::new(
            "entity",
            vec![
                FieldDescriptor::new(
                    "num_partitions",
                    int(),
                    "Number of partitions for this entity type, 1 if unpartitioned. \
                     Every entity type must use the same number of partitions.",
                )
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "featurized",
                    boolean(),
                    "Whether entities of this type are represented as sets of features.",
                )
                .with_default(json!(false)),
                FieldDescriptor::new(
                    "dimension",
                    optional(int()),
                    "Overrides the global embedding dimension for this entity type.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::Positive),
            ],
        )
    }
}

impl RelationConfig {
    /// Declarative description of the `relation` record.
    pub fn record() -> RecordType {
        RecordType::new(
            "relation",
            vec![
                FieldDescriptor::new(
                    "name",
                    string(),
                    "Human-readable identifier for this relation type; used in logging, \
                     not in training.",
                )
                .constrained(Constraint::NonEmpty),
                FieldDescriptor::new(
                    "lhs",
                    string(),
                    "Entity type on the left-hand side of this relation, as keyed in the \
                     entities mapping.",
                )
                .constrained(Constraint::NonEmpty),
                FieldDescriptor::new(
                    "rhs",
                    string(),
                    "Entity type on the right-hand side of this relation, as keyed in the \
                     entities mapping.",
                )
                .constrained(Constraint::NonEmpty),
                FieldDescriptor::new(
                    "weight",
                    float(),
                    "Multiplier on the loss induced by edges of this relation type.",
                )
                .with_default(json!(1.0))
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "operator",
                    string(),
                    "Transformation applied to the embedding of one side of the edge \
                     (typically the right-hand one) before comparing it with the other.",
                )
                .with_default(json!("none")),
                FieldDescriptor::new(
                    "all_negs",
                    boolean(),
                    "Use every entity of the same type and partition as a negative, on \
                     both sides, instead of sampling.",
                )
                .with_default(json!(false)),
            ],
        )
    }
}

impl GraphConfig {
    /// Declarative description of the top-level `config` record.
    pub fn record() -> RecordType {
        RecordType::new(
            "config",
            vec![
                // Model.
                FieldDescriptor::new(
                    "entities",
                    FieldKind::Map(EntityConfig::record()),
                    "The entity types. The key of each entry is the ID relation types \
                     reference it with.",
                )
                .constrained(Constraint::NonEmpty),
                FieldDescriptor::new(
                    "relations",
                    FieldKind::List(RelationConfig::record()),
                    "The relation types. Edge lists reference them by their index in \
                     this list.",
                )
                .constrained(Constraint::NonEmpty),
                FieldDescriptor::new(
                    "dimension",
                    int(),
                    "Dimension of the real space the embeddings live in.",
                )
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "init_scale",
                    float(),
                    "Standard deviation of the centered normal distribution initial \
                     embeddings are sampled from when none are provided.",
                )
                .with_default(json!(1e-3))
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "max_norm",
                    optional(float()),
                    "Rescale embeddings whose norm exceeds this value.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "global_emb",
                    boolean(),
                    "Learn one extra vector per entity type, added to each of its \
                     embeddings.",
                )
                .with_default(json!(true)),
                FieldDescriptor::new(
                    "comparator",
                    string(),
                    "How the two sides of an edge are compared to produce a score.",
                )
                .with_default(json!("cos")),
                FieldDescriptor::new(
                    "bias",
                    boolean(),
                    "Withhold the first embedding dimension from the comparator and add \
                     it back to the score as a bias. Pairs with logistic and softmax \
                     losses.",
                )
                .with_default(json!(false)),
                FieldDescriptor::new(
                    "loss_fn",
                    string(),
                    "How the scores of positive edges are evaluated against their \
                     negatives.",
                )
                .with_default(json!("ranking")),
                FieldDescriptor::new(
                    "margin",
                    float(),
                    "Minimum separation between positive and negative scores under \
                     ranking loss before a linear loss is incurred.",
                )
                .with_default(json!(0.1)),
                // Data.
                FieldDescriptor::new(
                    "entity_path",
                    string(),
                    "Directory containing the entity count files.",
                ),
                FieldDescriptor::new(
                    "edge_paths",
                    FieldKind::ScalarList(ScalarKind::Str),
                    "Directories containing partitioned edge lists; typically a single \
                     one.",
                ),
                FieldDescriptor::new(
                    "checkpoint_path",
                    string(),
                    "Directory checkpoints (and thus the output) are written to. \
                     Training resumes from any checkpoints found in it.",
                ),
                FieldDescriptor::new(
                    "init_path",
                    optional(string()),
                    "Directory containing initial embedding values for the entities of \
                     some types.",
                )
                .with_default(Value::Null),
                FieldDescriptor::new(
                    "checkpoint_preservation_interval",
                    optional(int()),
                    "Archive a snapshot of the checkpoint every so many epochs, under \
                     an epoch_{N} sub-directory of the checkpoint directory.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::Positive),
                // Training.
                FieldDescriptor::new(
                    "num_epochs",
                    int(),
                    "Times the training loop iterates over all the edges.",
                )
                .with_default(json!(1))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "num_edge_chunks",
                    optional(int()),
                    "Equally-sized parts each bucket is split into. Higher values mix \
                     partitions better at the cost of extra I/O. Derived from \
                     max_edges_per_chunk when unset.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "max_edges_per_chunk",
                    int(),
                    "Ceiling on edges per chunk when the number of edge chunks is \
                     derived automatically. Each edge takes at least 12 bytes.",
                )
                .with_default(json!(1_000_000_000_i64))
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "bucket_order",
                    FieldKind::Enum(BucketOrder::VARIANTS),
                    "Order in which the buckets are iterated over.",
                )
                .with_default(json!("inside_out")),
                FieldDescriptor::new(
                    "workers",
                    optional(int()),
                    "Worker processes for lock-free training; CPU count when unset.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::Positive),
                FieldDescriptor::new("batch_size", int(), "Edges per batch.")
                    .with_default(json!(1000))
                    .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "num_batch_negs",
                    int(),
                    "Negatives sampled from the batch, per positive edge.",
                )
                .with_default(json!(50))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "num_uniform_negs",
                    int(),
                    "Negatives sampled uniformly from the currently active partition, \
                     per positive edge.",
                )
                .with_default(json!(50))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "disable_lhs_negs",
                    boolean(),
                    "Disable negative sampling on the left-hand side.",
                )
                .with_default(json!(false)),
                FieldDescriptor::new(
                    "disable_rhs_negs",
                    boolean(),
                    "Disable negative sampling on the right-hand side.",
                )
                .with_default(json!(false)),
                FieldDescriptor::new("lr", float(), "Learning rate for the optimizer.")
                    .with_default(json!(1e-2))
                    .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "relation_lr",
                    optional(float()),
                    "Learning rate for relation parameters; lr is used when unset.",
                )
                .with_default(Value::Null)
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "eval_fraction",
                    float(),
                    "Fraction of edges withheld from training to track evaluation \
                     metrics.",
                )
                .with_default(json!(0.05))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "eval_num_batch_negs",
                    int(),
                    "Overrides num_batch_negs during the evaluation steps run before \
                     and after each training step.",
                )
                .with_default(json!(1000))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "eval_num_uniform_negs",
                    int(),
                    "Overrides num_uniform_negs during the evaluation steps run before \
                     and after each training step.",
                )
                .with_default(json!(1000))
                .constrained(Constraint::NonNegative),
                // Expert.
                FieldDescriptor::new(
                    "background_io",
                    boolean(),
                    "Do load/save in a background process. Deprecated.",
                )
                .with_default(json!(false)),
                FieldDescriptor::new("verbose", int(), "Logging verbosity, currently 0 or 1.")
                    .with_default(json!(0))
                    .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "hogwild_delay",
                    float(),
                    "Seconds to delay the start of every worker but the first, on the \
                     first epoch.",
                )
                .with_default(json!(2.0))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "dynamic_relations",
                    boolean(),
                    "Dynamic relation mode: a single relation type whose parameters \
                     apply to a runtime-provided number of relations, with batches \
                     mixing relation types and negatives sampled accordingly.",
                )
                .with_default(json!(false)),
                // Distributed.
                FieldDescriptor::new(
                    "num_machines",
                    int(),
                    "Machines participating in distributed training.",
                )
                .with_default(json!(1))
                .constrained(Constraint::Positive),
                FieldDescriptor::new(
                    "num_partition_servers",
                    int(),
                    "-1 to use trainers as partition servers, 0 to swap partitions \
                     through disk, a positive count for servers started manually.",
                )
                .with_default(json!(-1)),
                FieldDescriptor::new(
                    "distributed_init_method",
                    optional(string()),
                    "URI (file://, tcp://, ...) synchronizing the workers of a \
                     distributed run.",
                )
                .with_default(Value::Null),
                FieldDescriptor::new(
                    "distributed_tree_init_order",
                    boolean(),
                    "Only train a bucket once one of its partitions was trained on \
                     earlier in the same round, or contains partition 0.",
                )
                .with_default(json!(true)),
                FieldDescriptor::new("num_gpus", int(), "GPUs used for training. Experimental.")
                    .with_default(json!(0))
                    .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "num_groups_for_partition_server",
                    int(),
                    "Communication groups used by the partition servers; around 16 \
                     typically improves bandwidth.",
                )
                .with_default(json!(16))
                .constrained(Constraint::NonNegative),
                FieldDescriptor::new(
                    "half_precision",
                    boolean(),
                    "Train in half precision (GPU only).",
                )
                .with_default(json!(false)),
            ],
        )
    }
}
