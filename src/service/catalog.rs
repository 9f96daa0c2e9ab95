/// 目录搜索默认返回条数上限
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// 目录索引
/// 会话级只读产品名列表, 跨搜索并发共享安全
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    products: Vec<String>,
}

impl CatalogIndex {
    pub fn new(products: Vec<String>) -> Self {
        Self { products }
    }

    /// 大小写不敏感子串搜索, 保持目录顺序, 最多返回 limit 条
    /// 空查询固定返回空集 (成本控制策略, 不是错误)
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.products
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
