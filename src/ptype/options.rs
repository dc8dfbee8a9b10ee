//! 結合の設定

/// 入れ子の深さの上限の既定値
///
/// 解決・確定・結合の再帰がいずれも既定のスレッドスタック（2 MiB）に収まる値。
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// 片方のデータフレームにしかない列の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// `IncompatibleColumns` エラーにする
    #[default]
    Strict,
    /// 列の和集合を取る（x の列の後に y にしかない列）
    Union,
}

/// ptype 結合の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtypeOptions {
    pub max_depth: usize,
    pub columns: ColumnPolicy,
}

impl PtypeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_columns(mut self, columns: ColumnPolicy) -> Self {
        self.columns = columns;
        self
    }
}

impl Default for PtypeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            columns: ColumnPolicy::Strict,
        }
    }
}
