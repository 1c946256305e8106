pub const QUERY_INSERT_BROADCAST: &str = r#"
INSERT INTO broadcast(id,kind,status,article_count,created_at,updated_at)
VALUES($1,$2,$3,$4,$5,$6);
"#;

pub const QUERY_INSERT_BROADCAST_ARTICLE: &str = r#"
INSERT INTO broadcast_article(broadcast_id,article_index,title,body,media_ref)
VALUES($1,$2,$3,$4,$5);
"#;

pub const QUERY_GET_BROADCAST: &str = r#"
SELECT
    id,kind,status,article_count,created_at
FROM broadcast
WHERE id=$1;
"#;

pub const QUERY_GET_LIVE_BROADCAST_ARTICLES: &str = r#"
SELECT
    article_index,title,body,media_ref
FROM broadcast_article
WHERE
    broadcast_id=$1 AND
    retracted_at IS NULL
ORDER BY article_index;
"#;

pub const QUERY_MARK_ARTICLE_RETRACTED: &str = r#"
UPDATE broadcast_article
SET retracted_at=$3
WHERE
    broadcast_id=$1 AND
    article_index=$2 AND
    retracted_at IS NULL;
"#;

pub const QUERY_UPDATE_BROADCAST_STATUS: &str = r#"
UPDATE broadcast
SET status=$2, updated_at=$3
WHERE id=$1;
"#;

pub const QUERY_IS_OPERATOR_SESSION_ACTIVE: &str = r#"
SELECT EXISTS(
    SELECT 1 FROM operator_session
    WHERE token=$1 AND expires_at>$2
) AS is_active;
"#;
