/*
** This file is a part of Xylem (XML tree loader for configuration data)
**
** Xylem is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

pub(super) mod description {
    pub(in super::super) const UNNAMED_ELEMENT: &str = "element without a name";
    pub(in super::super) const DUPLICATE_ATTRIBUTE: &str = "duplicated attribute name";
    pub(in super::super) const UNPAIRED_CLOSE: &str = "unpaired closing tag";
    pub(in super::super) const UNEXPECTED_END: &str = "unexpected end of data";
}
