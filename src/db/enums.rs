use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Organization lifecycle status. Suspended tenants never receive credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Suspended,
}

impl FromSql<Text, Pg> for OrganizationStatus {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "active" => Ok(OrganizationStatus::Active),
            "suspended" => Ok(OrganizationStatus::Suspended),
            _ => Err("Unrecognized organization status".into()),
        }
    }
}

impl ToSql<Text, Pg> for OrganizationStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            OrganizationStatus::Active => out.write_all(b"active")?,
            OrganizationStatus::Suspended => out.write_all(b"suspended")?,
        }
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Enterprise,
}

impl FromSql<Text, Pg> for SubscriptionPlan {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "free" => Ok(SubscriptionPlan::Free),
            "pro" => Ok(SubscriptionPlan::Pro),
            "enterprise" => Ok(SubscriptionPlan::Enterprise),
            _ => Err("Unrecognized subscription plan".into()),
        }
    }
}

impl ToSql<Text, Pg> for SubscriptionPlan {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            SubscriptionPlan::Free => out.write_all(b"free")?,
            SubscriptionPlan::Pro => out.write_all(b"pro")?,
            SubscriptionPlan::Enterprise => out.write_all(b"enterprise")?,
        }
        Ok(IsNull::No)
    }
}

/// External system an integration connects to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum SystemType {
    Jira,
    Notion,
    Confluence,
    Slack,
}

impl SystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemType::Jira => "jira",
            SystemType::Notion => "notion",
            SystemType::Confluence => "confluence",
            SystemType::Slack => "slack",
        }
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql<Text, Pg> for SystemType {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "jira" => Ok(SystemType::Jira),
            "notion" => Ok(SystemType::Notion),
            "confluence" => Ok(SystemType::Confluence),
            "slack" => Ok(SystemType::Slack),
            _ => Err("Unrecognized system type".into()),
        }
    }
}

impl ToSql<Text, Pg> for SystemType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
    Error,
}

impl FromSql<Text, Pg> for IntegrationStatus {
    fn from_sql(bytes: <Pg as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match s.as_str() {
            "connected" => Ok(IntegrationStatus::Connected),
            "disconnected" => Ok(IntegrationStatus::Disconnected),
            "error" => Ok(IntegrationStatus::Error),
            _ => Err("Unrecognized integration status".into()),
        }
    }
}

impl ToSql<Text, Pg> for IntegrationStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            IntegrationStatus::Connected => out.write_all(b"connected")?,
            IntegrationStatus::Disconnected => out.write_all(b"disconnected")?,
            IntegrationStatus::Error => out.write_all(b"error")?,
        }
        Ok(IsNull::No)
    }
}
