pub mod display;
pub mod environment;
pub mod fs;
pub mod paths;

pub use environment::get_claude_dir;
pub use fs::{FileStat, count_nonempty_lines, write_atomically};
pub use paths::{
    INDEX_FILENAME, decode_project_dir_name, format_path_with_tilde, index_path, is_transcript_file,
    project_dir_of, session_id_from_path,
};
