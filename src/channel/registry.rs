use std::{any::Any, fmt, sync::Arc};

use dashmap::DashMap;

type Resource = Arc<dyn Any + Send + Sync>;

/// Общий реестр именованных ресурсов.
///
/// Позволяет независимо настроенным стадиям конвейера обменяться живым
/// ресурсом (например, открытым каналом) по договорённости об имени, а не
/// по прямой ссылке. Это явный объект контекста: его передают по ссылке
/// через конвейер, глобального состояния нет. Клоны разделяют одно
/// хранилище.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    /// Хранилище: имя -> ресурс.
    entries: Arc<DashMap<String, Resource>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сохраняет ресурс под именем.
    ///
    /// # Возвращает
    /// - `true`, если под этим именем уже был ресурс и он заменён.
    pub fn put<T: Any + Send + Sync>(
        &self,
        name: impl Into<String>,
        resource: Arc<T>,
    ) -> bool {
        self.entries.insert(name.into(), resource).is_some()
    }

    /// Возвращает ресурс по имени.
    ///
    /// # Возвращает
    /// - `Some(Arc<T>)`, если ресурс есть и имеет тип `T`
    /// - `None`, если имени нет или тип не совпадает
    pub fn get<T: Any + Send + Sync>(
        &self,
        name: &str,
    ) -> Option<Arc<T>> {
        let resource = self.entries.get(name)?.value().clone();
        resource.downcast::<T>().ok()
    }

    pub fn has(
        &self,
        name: &str,
    ) -> bool {
        self.entries.contains_key(name)
    }

    /// Удаляет ресурс. Отсутствие имени не считается ошибкой.
    pub fn remove(
        &self,
        name: &str,
    ) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Имена всех ресурсов в отсортированном виде.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("names", &self.names())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
