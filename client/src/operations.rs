//! Operation codes understood by the WebHDFS REST endpoint.
//!
//! Each variant maps to the token sent as the `op=` query parameter.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Append,
    Open,
    Mkdirs,
    Delete,
    Rename,
    GetFileStatus,
    GetContentSummary,
    GetFileChecksum,
    ListStatus,
    GetHomeDirectory,
    SetPermission,
    SetOwner,
    SetReplication,
    SetXAttr,
    GetXAttrs,
    ListXAttrs,
    RemoveXAttr,
}

impl Operation {
    /// The wire token, inserted verbatim after `op=`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Append => "APPEND",
            Operation::Open => "OPEN",
            Operation::Mkdirs => "MKDIRS",
            Operation::Delete => "DELETE",
            Operation::Rename => "RENAME",
            Operation::GetFileStatus => "GETFILESTATUS",
            Operation::GetContentSummary => "GETCONTENTSUMMARY",
            Operation::GetFileChecksum => "GETFILECHECKSUM",
            Operation::ListStatus => "LISTSTATUS",
            Operation::GetHomeDirectory => "GETHOMEDIRECTORY",
            Operation::SetPermission => "SETPERMISSION",
            Operation::SetOwner => "SETOWNER",
            Operation::SetReplication => "SETREPLICATION",
            Operation::SetXAttr => "SETXATTR",
            Operation::GetXAttrs => "GETXATTRS",
            Operation::ListXAttrs => "LISTXATTRS",
            Operation::RemoveXAttr => "REMOVEXATTR",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
