//! Backend SQL templates
//!
//! Every template binds the window as `?1` (start) and `?2` (end), both
//! `YYYY-MM-DD`, compared against calendar dates so both ends are inclusive.
//! `{sources}` is replaced by [`render`] with a quoted list built only from
//! [`Platform`] values.
//!
//! Revenue is attributed through each member's latest lead row, so a member
//! with several form submissions is counted under one source and content.

use crate::platforms::types::Platform;

/// Placeholder for the platform IN list
const SOURCES_PLACEHOLDER: &str = "{sources}";

/// Latest lead row per member, newest CreateDate first and highest Id on ties
macro_rules! latest_lead_cte {
    () => {
        r#"
WITH latest_lead AS (
    SELECT Id, MemberId, UtmSource, UtmMedium, UtmContent
    FROM (
        SELECT Id, MemberId, UtmSource, UtmMedium, UtmContent,
               ROW_NUMBER() OVER (PARTITION BY MemberId ORDER BY CreateDate DESC, Id DESC) AS rn
        FROM MemberForm
    )
    WHERE rn = 1
)
"#
    };
}

/// Raw lead rows
pub const LEAD_QUERY: &str = r#"
SELECT
    MemberId,
    UtmSource,
    COALESCE(UtmMedium, '') AS UtmMedium,
    COALESCE(UtmTerm, '') AS UtmTerm,
    COALESCE(UtmContent, '') AS UtmContent,
    strftime('%Y-%m-%dT%H:%M:%S', CreateDate) AS CreateDate
FROM MemberForm
WHERE UtmSource IN ({sources})
  AND BrandId = 1
  AND date(CreateDate) BETWEEN ?1 AND ?2
ORDER BY CreateDate DESC, Id DESC
"#;

/// Distinct members per (source, content)
pub const LEAD_COUNT_BY_SOURCE_CONTENT: &str = r#"
SELECT
    UtmSource,
    COALESCE(UtmContent, '') AS UtmContent,
    COUNT(DISTINCT MemberId) AS LeadCount,
    date(MIN(CreateDate)) AS FirstLeadDate,
    date(MAX(CreateDate)) AS LastLeadDate
FROM MemberForm
WHERE UtmSource IN ({sources})
  AND BrandId = 1
  AND date(CreateDate) BETWEEN ?1 AND ?2
GROUP BY UtmSource, COALESCE(UtmContent, '')
ORDER BY LeadCount DESC, UtmSource, UtmContent
"#;

/// Distinct members per day and source
pub const LEAD_DAILY_TREND: &str = r#"
SELECT
    date(CreateDate) AS Date,
    UtmSource,
    COUNT(DISTINCT MemberId) AS LeadCount
FROM MemberForm
WHERE UtmSource IN ({sources})
  AND BrandId = 1
  AND date(CreateDate) BETWEEN ?1 AND ?2
GROUP BY date(CreateDate), UtmSource
ORDER BY Date ASC, UtmSource ASC
"#;

/// Paid new-sale orders with member and product detail
pub const REVENUE_QUERY: &str = concat!(
    latest_lead_cte!(),
    r#"
SELECT
    ll.MemberId AS MemberId,
    ll.UtmSource AS UtmSource,
    COALESCE(ll.UtmMedium, '') AS UtmMedium,
    COALESCE(ll.UtmContent, '') AS UtmContent,
    T.StudentName AS StudentName,
    T.StudentNo AS StudentNo,
    P.Title AS Product,
    O.Price AS Price,
    O.TotalPrice AS TotalPrice,
    ROUND(O.TotalPrice / 1.1, 2) AS NetPrice,
    date(O.CreateDate) AS OrderDate
FROM latest_lead ll
INNER JOIN Member M ON M.ID = ll.MemberId
INNER JOIN EmployeeMember EM ON EM.MemberId = M.ID AND EM.Status = 1 AND EM.EmployeeTypeId = 4
INNER JOIN Term T ON T.MemberId = ll.MemberId
INNER JOIN Product P ON P.ID = T.ProductId
INNER JOIN OrderTermDetail OTD ON OTD.TermId = T.ID
INNER JOIN "Order" O ON O.Id = OTD.OrderId
INNER JOIN Payment PM ON PM.OrderId = OTD.OrderId
WHERE ll.UtmSource IN ({sources})
  AND date(O.CreateDate) BETWEEN ?1 AND ?2
  AND T.SalesType = 1
  AND O.TotalPrice > 0
  AND PM.Status = 1
ORDER BY O.CreateDate DESC, O.Id DESC
"#
);

/// Orders and revenue per (source, content)
pub const REVENUE_SUMMARY_BY_SOURCE_CONTENT: &str = concat!(
    latest_lead_cte!(),
    r#"
SELECT
    ll.UtmSource AS UtmSource,
    COALESCE(ll.UtmContent, '') AS UtmContent,
    COUNT(DISTINCT O.Id) AS OrderCount,
    SUM(O.TotalPrice) AS TotalRevenue,
    SUM(ROUND(O.TotalPrice / 1.1, 2)) AS NetRevenue,
    AVG(O.TotalPrice) AS AvgOrderValue
FROM latest_lead ll
INNER JOIN Term T ON T.MemberId = ll.MemberId
INNER JOIN OrderTermDetail OTD ON OTD.TermId = T.ID
INNER JOIN "Order" O ON O.Id = OTD.OrderId
INNER JOIN Payment PM ON PM.OrderId = OTD.OrderId
WHERE ll.UtmSource IN ({sources})
  AND date(O.CreateDate) BETWEEN ?1 AND ?2
  AND T.SalesType = 1
  AND O.TotalPrice > 0
  AND PM.Status = 1
GROUP BY ll.UtmSource, COALESCE(ll.UtmContent, '')
ORDER BY TotalRevenue DESC, UtmSource, UtmContent
"#
);

/// Orders and revenue per day and source
pub const REVENUE_DAILY_TREND: &str = concat!(
    latest_lead_cte!(),
    r#"
SELECT
    date(O.CreateDate) AS Date,
    ll.UtmSource AS UtmSource,
    SUM(O.TotalPrice) AS TotalRevenue,
    COUNT(DISTINCT O.Id) AS OrderCount
FROM latest_lead ll
INNER JOIN Term T ON T.MemberId = ll.MemberId
INNER JOIN OrderTermDetail OTD ON OTD.TermId = T.ID
INNER JOIN "Order" O ON O.Id = OTD.OrderId
INNER JOIN Payment PM ON PM.OrderId = OTD.OrderId
WHERE ll.UtmSource IN ({sources})
  AND date(O.CreateDate) BETWEEN ?1 AND ?2
  AND T.SalesType = 1
  AND O.TotalPrice > 0
  AND PM.Status = 1
GROUP BY date(O.CreateDate), ll.UtmSource
ORDER BY Date ASC, UtmSource ASC
"#
);

/// Quoted, comma-separated platform list, e.g. `'google', 'facebook'`
pub fn format_sources(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| format!("'{}'", p.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Substitute the platform list into a template
pub fn render(template: &str, platforms: &[Platform]) -> String {
    template.replace(SOURCES_PLACEHOLDER, &format_sources(platforms))
}
