use crate::domain::comment::{CommentAmount, ReceivingId};

/// Raw `/comment` query string.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommentQuery {
    pub n: Option<String>,
    pub id: Option<String>,
    pub key: Option<String>,
}

impl CommentQuery {
    /// Collects the known parameters from decoded query pairs. A repeated
    /// parameter keeps its first value; unknown names are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "n" => &mut query.n,
                "id" => &mut query.id,
                "key" => &mut query.key,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Clone, Debug)]
pub struct IncomingCommentRequest {
    pub amount: Option<String>,
    pub receiving_id: Option<String>,
    pub key: Option<String>,
    pub caller_ip: String,
}

impl IncomingCommentRequest {
    pub fn from_query(query: CommentQuery, caller_ip: impl Into<String>) -> Self {
        Self {
            amount: query.n,
            receiving_id: query.id,
            key: query.key,
            caller_ip: caller_ip.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedComment {
    pub amount: CommentAmount,
    pub receiving_id: ReceivingId,
}

impl ValidatedComment {
    /// Positional arguments in the order the `comment` command expects.
    pub fn args(&self) -> Vec<String> {
        vec![
            self.amount.as_str().to_string(),
            self.receiving_id.as_str().to_string(),
        ]
    }
}
