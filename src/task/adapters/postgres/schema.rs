//! Diesel schema for task lifecycle persistence.

diesel::table! {
    /// Task records of every scan module.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Module tag (`scanning`, `autotest`, `cloc`, `dast`).
        #[max_length = 20]
        module -> Varchar,
        /// Module-specific attributes.
        profile -> Jsonb,
        /// Git URL or target URL.
        source -> Text,
        /// Branch or ref, when the module uses one.
        #[max_length = 255]
        branch -> Nullable<Varchar>,
        /// Task status.
        #[max_length = 20]
        status -> Varchar,
        /// Owning user.
        owner_id -> Nullable<Uuid>,
        /// Durable artifact object key.
        artifact -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Variant-specific subtasks.
    subtasks (id) {
        /// Subtask identifier.
        id -> Uuid,
        /// Insertion sequence used to keep creation order.
        seq -> Int8,
        /// Owning task.
        task_id -> Uuid,
        /// Variant discriminator.
        variant -> Jsonb,
        /// Subtask status.
        #[max_length = 20]
        status -> Varchar,
        /// Worker log group.
        log_group -> Nullable<Text>,
        /// Worker log stream.
        log_stream -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Result rows parsed from worker reports.
    findings (id) {
        /// Finding identifier.
        id -> Uuid,
        /// Insertion sequence used to keep report order.
        seq -> Int8,
        /// Owning task.
        task_id -> Uuid,
        /// Owning subtask, for fan-out modules.
        subtask_id -> Nullable<Uuid>,
        /// Structured finding content.
        body -> Jsonb,
        /// User note.
        note -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(subtasks -> tasks (task_id));
diesel::joinable!(findings -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, subtasks, findings);
